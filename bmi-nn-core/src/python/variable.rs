//! Python bindings for variable descriptors
//!
//! Python owns its descriptors outright, so values passed in are copied and
//! [`PyBmiVariable::value`] returns a copy.

use crate::grid::Grid;
use crate::python::grid::PyGrid;
use crate::python::value::{value_from_py, variable_value_to_py};
use crate::value::ValueType;
use crate::variable::{BmiVariable, GridLocation};
use pyo3::prelude::*;
use std::sync::Arc;

#[pyclass(name = "BmiVariable", module = "bmi_nn.core")]
#[derive(Debug, Clone)]
pub struct PyBmiVariable(pub BmiVariable<'static>);

#[pymethods]
impl PyBmiVariable {
    #[new]
    #[pyo3(signature = (name, grid=None, value_type=None, units=None, value=None, location="node"))]
    fn new(
        name: String,
        grid: Option<PyGrid>,
        value_type: Option<&str>,
        units: Option<String>,
        value: Option<&Bound<'_, PyAny>>,
        location: &str,
    ) -> PyResult<Self> {
        let value_type = value_type.map(str::parse::<ValueType>).transpose()?;
        let location: GridLocation = location.parse()?;

        let mut builder = BmiVariable::builder(name)
            .grid(grid.map_or_else(|| Arc::new(Grid::scalar(0)), |g| g.0))
            .location(location);
        if let Some(value_type) = value_type {
            builder = builder.value_type(value_type);
        }
        if let Some(units) = units {
            builder = builder.units(units);
        }
        if let Some(value) = value {
            builder = builder.value(value_from_py(value, value_type)?);
        }
        Ok(Self(builder.build()?))
    }

    #[getter]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[getter]
    fn grid(&self) -> PyGrid {
        PyGrid(self.0.grid().clone())
    }

    #[setter]
    fn set_grid(&mut self, grid: PyGrid) -> PyResult<()> {
        Ok(self.0.set_grid(grid.0)?)
    }

    #[getter]
    fn value_type(&self) -> &'static str {
        self.0.value_type().as_str()
    }

    #[getter]
    fn units(&self) -> &str {
        self.0.units()
    }

    #[getter]
    fn location(&self) -> &'static str {
        self.0.location().as_str()
    }

    #[getter]
    fn value(&self, py: Python<'_>) -> PyObject {
        variable_value_to_py(py, self.0.value())
    }

    #[setter]
    fn set_value(&mut self, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let value = value_from_py(value, Some(self.0.value_type()))?;
        Ok(self.0.set_value(value)?)
    }

    #[getter]
    fn rank(&self) -> usize {
        self.0.rank()
    }

    #[getter]
    fn itemsize(&self) -> usize {
        self.0.itemsize()
    }

    #[getter]
    fn nbytes(&self) -> usize {
        self.0.nbytes()
    }

    fn __repr__(&self) -> String {
        format!(
            "BmiVariable(name='{}', grid={}, value_type='{}', units='{}', location='{}')",
            self.0.name(),
            self.0.grid().id(),
            self.0.value_type(),
            self.0.units(),
            self.0.location()
        )
    }
}
