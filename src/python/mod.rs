use bmi_nn_components::python::components;
use bmi_nn_core::python::core;
use pyo3::prelude::*;
use pyo3::wrap_pymodule;

#[pymodule]
#[pyo3(name = "_lib")]
fn bmi_nn(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_wrapped(wrap_pymodule!(core))?;
    m.add_wrapped(wrap_pymodule!(components))?;

    set_path(m, "bmi_nn._lib.core", "core")?;
    set_path(m, "bmi_nn._lib.components", "components")?;

    Ok(())
}

/// Register a sub-module in `sys.modules` so it can be imported by its dotted path
fn set_path(m: &Bound<'_, PyModule>, path: &str, module: &str) -> PyResult<()> {
    let code = format!(
        "\
import sys
sys.modules['{path}'] = {module}
    "
    );
    m.py().run_bound(&code, None, Some(&m.dict()))
}
