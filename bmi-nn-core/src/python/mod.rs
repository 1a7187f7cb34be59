use crate::errors::BmiError;
use pyo3::exceptions::{PyKeyError, PyNotImplementedError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::{create_exception, pymodule, Bound, PyResult};

pub mod grid;
pub mod time;
pub mod value;
pub mod variable;

pub use grid::PyGrid;
pub use time::PyBmiTime;
pub use variable::PyBmiVariable;

create_exception!(
    core,
    UnknownBMIVariable,
    PyKeyError,
    "Raised when a BMI variable name is not declared by the model."
);

impl From<BmiError> for PyErr {
    fn from(err: BmiError) -> PyErr {
        match err {
            BmiError::Validation(_) | BmiError::Config(_) => PyValueError::new_err(err.to_string()),
            BmiError::UnknownVariable(_) => UnknownBMIVariable::new_err(err.to_string()),
            BmiError::NotImplemented(_) => PyNotImplementedError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[pymodule]
pub fn core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyGrid>()?;
    m.add_class::<PyBmiTime>()?;
    m.add_class::<PyBmiVariable>()?;
    m.add(
        "UnknownBMIVariable",
        m.py().get_type_bound::<UnknownBMIVariable>(),
    )?;
    Ok(())
}
