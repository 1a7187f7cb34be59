//! Python bindings for the runoff model
//!
//! Arrays cross the boundary as numpy copies. The `get_value*` methods follow the BMI
//! Python convention of filling the caller's array in place and returning it.

use bmi_nn_core::bmi::Bmi;
use bmi_nn_core::grid::GridId;
use bmi_nn_core::python::value::{value_from_py, value_ref_to_py, value_to_py};
use bmi_nn_core::value::Value;
use numpy::ToPyArray;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::{pymodule, Bound, PyResult};

use crate::components::BmiModel;
use crate::config::Config;

/// Copy `src` into every element of the caller's array
fn fill<'py>(dest: &Bound<'py, PyAny>, src: PyObject) -> PyResult<Bound<'py, PyAny>> {
    dest.set_item(dest.py().Ellipsis(), src)?;
    Ok(dest.clone())
}

#[pyclass(name = "BmiModel", module = "bmi_nn.components")]
#[derive(Debug, Default)]
pub struct PyBmiModel(pub BmiModel);

#[pymethods]
impl PyBmiModel {
    #[new]
    fn new() -> Self {
        Self(BmiModel::new())
    }

    /// Initialise from a TOML file path, a dict of configuration values, or the
    /// defaults when no configuration is given.
    #[pyo3(signature = (config=None))]
    fn initialize(&mut self, config: Option<&Bound<'_, PyAny>>) -> PyResult<()> {
        match config {
            None => Ok(self.0.initialize("")?),
            Some(config) => {
                if let Ok(path) = config.extract::<String>() {
                    Ok(self.0.initialize(&path)?)
                } else {
                    let config: Config = pythonize::depythonize_bound(config.clone())
                        .map_err(|e| PyValueError::new_err(format!("{}", e)))?;
                    Ok(self.0.initialize_with_config(config)?)
                }
            }
        }
    }

    fn update(&mut self) -> PyResult<()> {
        Ok(self.0.update()?)
    }

    fn update_until(&mut self, time: f64) -> PyResult<()> {
        Ok(self.0.update_until(time)?)
    }

    fn finalize(&mut self) -> PyResult<()> {
        Ok(self.0.finalize()?)
    }

    fn get_component_name(&self) -> String {
        self.0.get_component_name()
    }

    fn get_input_item_count(&self) -> PyResult<usize> {
        Ok(self.0.get_input_item_count()?)
    }

    fn get_output_item_count(&self) -> PyResult<usize> {
        Ok(self.0.get_output_item_count()?)
    }

    fn get_input_var_names(&self) -> PyResult<Vec<String>> {
        Ok(self.0.get_input_var_names()?.to_vec())
    }

    fn get_output_var_names(&self) -> PyResult<Vec<String>> {
        Ok(self.0.get_output_var_names()?.to_vec())
    }

    fn get_var_grid(&self, name: &str) -> PyResult<GridId> {
        Ok(self.0.get_var_grid(name)?)
    }

    fn get_var_type(&self, name: &str) -> PyResult<&'static str> {
        Ok(self.0.get_var_type(name)?.as_str())
    }

    fn get_var_units(&self, name: &str) -> PyResult<String> {
        Ok(self.0.get_var_units(name)?.to_string())
    }

    fn get_var_itemsize(&self, name: &str) -> PyResult<usize> {
        Ok(self.0.get_var_itemsize(name)?)
    }

    fn get_var_nbytes(&self, name: &str) -> PyResult<usize> {
        Ok(self.0.get_var_nbytes(name)?)
    }

    fn get_var_location(&self, name: &str) -> PyResult<&'static str> {
        Ok(self.0.get_var_location(name)?.as_str())
    }

    fn get_current_time(&self) -> PyResult<f64> {
        Ok(self.0.get_current_time()?)
    }

    fn get_start_time(&self) -> PyResult<f64> {
        Ok(self.0.get_start_time()?)
    }

    fn get_end_time(&self) -> PyResult<f64> {
        Ok(self.0.get_end_time()?)
    }

    fn get_time_units(&self) -> PyResult<&'static str> {
        Ok(self.0.get_time_units()?.as_str())
    }

    fn get_time_step(&self) -> PyResult<f64> {
        Ok(self.0.get_time_step()?)
    }

    /// Flat copy of a variable's values
    fn get_value_ptr(&self, py: Python<'_>, name: &str) -> PyResult<PyObject> {
        Ok(value_ref_to_py(py, self.0.get_value_ptr(name)?))
    }

    fn get_value<'py>(&self, name: &str, dest: &Bound<'py, PyAny>) -> PyResult<Bound<'py, PyAny>> {
        let src = self.0.get_value_ptr(name)?;
        fill(dest, value_ref_to_py(dest.py(), src))
    }

    fn get_value_at_indices<'py>(
        &self,
        name: &str,
        dest: &Bound<'py, PyAny>,
        indices: Vec<usize>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let src = self.0.get_value_ptr(name)?;
        let mut gathered = Value::zeros(src.value_type(), &[indices.len()]);
        self.0
            .get_value_at_indices(name, gathered.flat_mut(name)?, &indices)?;
        fill(dest, value_to_py(dest.py(), &gathered))
    }

    fn set_value(&mut self, name: &str, src: &Bound<'_, PyAny>) -> PyResult<()> {
        let value_type = self.0.get_var_type(name)?;
        let src = value_from_py(src, Some(value_type))?;
        Ok(self.0.set_value(name, src.flat(name)?)?)
    }

    fn set_value_at_indices(
        &mut self,
        name: &str,
        indices: Vec<usize>,
        src: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let value_type = self.0.get_var_type(name)?;
        let src = value_from_py(src, Some(value_type))?;
        Ok(self.0.set_value_at_indices(name, &indices, src.flat(name)?)?)
    }

    fn get_grid_rank(&self, grid: GridId) -> PyResult<usize> {
        Ok(self.0.get_grid_rank(grid)?)
    }

    fn get_grid_size(&self, grid: GridId) -> PyResult<usize> {
        Ok(self.0.get_grid_size(grid)?)
    }

    fn get_grid_type(&self, grid: GridId) -> PyResult<&'static str> {
        Ok(self.0.get_grid_type(grid)?.as_str())
    }

    fn get_grid_shape<'py>(
        &self,
        grid: GridId,
        shape: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let mut values = vec![0_usize; self.0.get_grid_rank(grid)?];
        self.0.get_grid_shape(grid, &mut values)?;
        let values = values.to_pyarray_bound(shape.py()).into_any().unbind();
        fill(shape, values)
    }

    fn __repr__(&self) -> String {
        format!("BmiModel(state={})", self.0.state())
    }
}

#[pymodule]
pub fn components(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBmiModel>()?;
    Ok(())
}
