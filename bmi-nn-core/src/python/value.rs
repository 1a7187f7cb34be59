//! Conversions between BMI buffers and numpy arrays
//!
//! Values always cross the boundary as copies.

use crate::errors::{BmiError, BmiResult};
use crate::value::{Value, ValueRef, ValueType, VariableValue};
use numpy::{PyArrayDyn, PyArrayMethods, ToPyArray};
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;

macro_rules! extract_array {
    ($obj:expr, $($t:ty),+) => {
        $(
            if let Ok(array) = $obj.downcast::<PyArrayDyn<$t>>() {
                let readonly = array.try_readonly()?;
                return Ok(readonly.as_array().as_standard_layout().into_owned().into());
            }
        )+
    };
}

/// Fail unless an array of dtype `dtype` can be stored as `expected` without a cast
pub fn require_dtype(dtype: &str, expected: ValueType) -> BmiResult<()> {
    match dtype.parse::<ValueType>() {
        Ok(found) if found == expected => Ok(()),
        _ => Err(BmiError::Validation(format!(
            "array of dtype {} cannot be stored as {} without a cast",
            dtype, expected
        ))),
    }
}

/// Copy a Python object into an owned, row-major buffer
///
/// numpy arrays keep their dtype, and must already match `value_type` when one is
/// given. Anything else goes through `numpy.asarray`, with plain numbers becoming
/// float32 unless a type is given.
pub fn value_from_py(obj: &Bound<'_, PyAny>, value_type: Option<ValueType>) -> PyResult<Value> {
    let py = obj.py();
    let numpy = PyModule::import_bound(py, "numpy")?;
    let is_array = obj.is_instance(&numpy.getattr("ndarray")?)?;
    if let (Some(value_type), true) = (value_type, is_array) {
        let dtype: String = obj.getattr("dtype")?.getattr("name")?.extract()?;
        require_dtype(&dtype, value_type)?;
    }

    let dtype = match (value_type, is_array) {
        (Some(value_type), _) => Some(value_type.as_str()),
        (None, true) => None,
        (None, false) => Some(ValueType::default().as_str()),
    };
    let array = numpy.call_method1("asarray", (obj, dtype))?;

    extract_array!(array, i16, i32, i64, f32, f64);

    Err(PyTypeError::new_err(format!(
        "unsupported array dtype {}, expected one of int16, int32, int64, float32, float64",
        array.getattr("dtype")?
    )))
}

pub fn value_to_py(py: Python<'_>, value: &Value) -> PyObject {
    match value {
        Value::Int16(a) => a.to_pyarray_bound(py).into_any().unbind(),
        Value::Int32(a) => a.to_pyarray_bound(py).into_any().unbind(),
        Value::Int64(a) => a.to_pyarray_bound(py).into_any().unbind(),
        Value::Float32(a) => a.to_pyarray_bound(py).into_any().unbind(),
        Value::Float64(a) => a.to_pyarray_bound(py).into_any().unbind(),
    }
}

pub fn variable_value_to_py(py: Python<'_>, value: &VariableValue<'_>) -> PyObject {
    match value {
        VariableValue::Int16(a) => a.to_pyarray_bound(py).into_any().unbind(),
        VariableValue::Int32(a) => a.to_pyarray_bound(py).into_any().unbind(),
        VariableValue::Int64(a) => a.to_pyarray_bound(py).into_any().unbind(),
        VariableValue::Float32(a) => a.to_pyarray_bound(py).into_any().unbind(),
        VariableValue::Float64(a) => a.to_pyarray_bound(py).into_any().unbind(),
    }
}

/// Copy a flat view into a one-dimensional numpy array
pub fn value_ref_to_py(py: Python<'_>, value: ValueRef<'_>) -> PyObject {
    match value {
        ValueRef::Int16(s) => s.to_pyarray_bound(py).into_any().unbind(),
        ValueRef::Int32(s) => s.to_pyarray_bound(py).into_any().unbind(),
        ValueRef::Int64(s) => s.to_pyarray_bound(py).into_any().unbind(),
        ValueRef::Float32(s) => s.to_pyarray_bound(py).into_any().unbind(),
        ValueRef::Float64(s) => s.to_pyarray_bound(py).into_any().unbind(),
    }
}
