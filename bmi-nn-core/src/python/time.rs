use crate::time::BmiTime;
use pyo3::prelude::*;

#[pyclass(name = "BmiTime", module = "bmi_nn.core")]
#[derive(Debug, Clone)]
pub struct PyBmiTime(pub BmiTime);

#[pymethods]
impl PyBmiTime {
    #[new]
    #[pyo3(signature = (
        current_time=0.0,
        start_time=0.0,
        end_time=f64::INFINITY,
        units="s",
        time_step=3600.0
    ))]
    fn new(
        current_time: f64,
        start_time: f64,
        end_time: f64,
        units: &str,
        time_step: f64,
    ) -> PyResult<Self> {
        Ok(Self(BmiTime::new(
            current_time,
            start_time,
            end_time,
            units,
            time_step,
        )?))
    }

    #[getter]
    fn current_time(&self) -> f64 {
        self.0.current_time
    }

    #[setter]
    fn set_current_time(&mut self, value: f64) {
        self.0.current_time = value;
    }

    #[getter]
    fn start_time(&self) -> f64 {
        self.0.start_time
    }

    #[getter]
    fn end_time(&self) -> f64 {
        self.0.end_time
    }

    #[getter]
    fn units(&self) -> &'static str {
        self.0.units.as_str()
    }

    #[setter]
    fn set_units(&mut self, value: &str) -> PyResult<()> {
        self.0.units = value.parse()?;
        Ok(())
    }

    #[getter]
    fn time_step(&self) -> f64 {
        self.0.time_step
    }

    fn __repr__(&self) -> String {
        format!(
            "BmiTime(current_time={}, start_time={}, end_time={}, units='{}', time_step={})",
            self.0.current_time, self.0.start_time, self.0.end_time, self.0.units, self.0.time_step
        )
    }
}
