//! BMI adapter for the feed-forward runoff network
//!
//! Every input and output is a float32 scalar on a single scalar grid (id 0). Each
//! update gathers the inputs into a single row, runs it through the network and
//! scatters the resulting row back into the output scalars.

use bmi_nn_core::bmi::{Bmi, ModelState};
use bmi_nn_core::errors::{BmiError, BmiResult};
use bmi_nn_core::grid::{Grid, GridId, GridType};
use bmi_nn_core::time::{BmiTime, TimeUnits};
use bmi_nn_core::value::{Value, ValueMut, ValueRef};
use bmi_nn_core::variable::{BmiVariable, GridLocation, DIMENSIONLESS};
use log::{debug, info, warn};
use ndarray::Array2;
use std::collections::HashMap;
use std::sync::Arc;

use crate::components::FeedForward;
use crate::config::Config;

/// Relative slack allowed when counting the steps to a target time
const STEP_TOLERANCE: f64 = 1e-9;

#[derive(Debug)]
pub struct BmiModel {
    state: ModelState,
    config: Config,
    grid: Arc<Grid>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    units: HashMap<String, String>,
    values: HashMap<String, Value>,
    time: BmiTime,
    network: Option<FeedForward>,
}

impl Default for BmiModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BmiModel {
    /// Create an uninitialised model declaring the default variables
    pub fn new() -> Self {
        let config = Config::default();
        let mut model = Self {
            state: ModelState::Uninitialized,
            grid: Arc::new(Grid::scalar(0)),
            input_names: vec![],
            output_names: vec![],
            units: HashMap::new(),
            values: HashMap::new(),
            time: config.time.clone(),
            network: None,
            config,
        };
        model.declare_variables();
        model
    }

    /// (Re)declare the input and output variables named in the configuration
    ///
    /// All values are reset to zero.
    fn declare_variables(&mut self) {
        self.input_names = self.config.input_variable.clone();
        self.output_names = self.config.output_variable.clone();
        self.units.clear();
        self.values.clear();
        for name in self.input_names.iter().chain(&self.output_names) {
            self.units.insert(name.clone(), DIMENSIONLESS.to_string());
            self.values.insert(name.clone(), Value::scalar(0.0_f32));
        }
    }

    /// Initialise from an already loaded configuration
    pub fn initialize_with_config(&mut self, config: Config) -> BmiResult<()> {
        self.state.require(ModelState::Uninitialized)?;
        config.validate()?;

        let network = FeedForward::from_config(&config)?;
        self.time = config.time.clone();
        self.time.reset();
        self.config = config;
        self.declare_variables();
        self.network = Some(network);
        self.state = ModelState::Initialized;

        info!(
            "Initialized {} with inputs {:?} and outputs {:?}",
            self.get_component_name(),
            self.input_names,
            self.output_names
        );
        Ok(())
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Descriptor for a declared variable, viewing the live buffer
    pub fn variable(&self, name: &str) -> BmiResult<BmiVariable<'_>> {
        let value = self.value(name)?;
        BmiVariable::builder(name)
            .grid(self.grid.clone())
            .units(self.units_of(name)?)
            .value(value.view())
            .location(GridLocation::Node)
            .build()
    }

    fn value(&self, name: &str) -> BmiResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| BmiError::UnknownVariable(name.to_string()))
    }

    fn value_mut(&mut self, name: &str) -> BmiResult<&mut Value> {
        self.values
            .get_mut(name)
            .ok_or_else(|| BmiError::UnknownVariable(name.to_string()))
    }

    fn units_of(&self, name: &str) -> BmiResult<&str> {
        self.units
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| BmiError::UnknownVariable(name.to_string()))
    }

    fn check_grid(&self, grid: GridId) -> BmiResult<&Grid> {
        if grid == self.grid.id() {
            Ok(&self.grid)
        } else {
            Err(BmiError::UnknownGrid(grid))
        }
    }

    fn scalar(&self, name: &str) -> BmiResult<f32> {
        let flat = self.value(name)?.flat(name)?;
        flat.as_slice::<f32>()
            .and_then(|s| s.first().copied())
            .ok_or_else(|| BmiError::Error(format!("{} does not hold a float32 scalar", name)))
    }

    /// Number of whole time steps between the current time and `time`
    ///
    /// Negative when `time` lies behind the current time. A ratio within
    /// [`STEP_TOLERANCE`] of the next integer counts as that many steps, so steps
    /// that are not exactly representable still reach their target.
    fn steps_until(&self, time: f64) -> BmiResult<i64> {
        if !time.is_finite() {
            return Err(BmiError::Error(format!(
                "cannot update until non-finite time {}",
                time
            )));
        }
        if self.time.time_step == 0.0 {
            return Err(BmiError::Error(
                "cannot update until a target time with a zero time step".to_string(),
            ));
        }
        let ratio = (time - self.time.current_time) / self.time.time_step;
        if !ratio.is_finite() {
            return Err(BmiError::Error(format!(
                "cannot step from {} to {} with time step {}",
                self.time.current_time, time, self.time.time_step
            )));
        }
        Ok((ratio + STEP_TOLERANCE * ratio.abs().max(1.0)).floor() as i64)
    }
}

impl Bmi for BmiModel {
    fn initialize(&mut self, config_file: &str) -> BmiResult<()> {
        self.state.require(ModelState::Uninitialized)?;
        let config = if config_file.is_empty() {
            Config::default()
        } else {
            Config::from_file(config_file)?
        };
        self.initialize_with_config(config)
    }

    fn update(&mut self) -> BmiResult<()> {
        self.state.require(ModelState::Initialized)?;
        let network = self
            .network
            .as_ref()
            .ok_or_else(|| BmiError::Error("network has not been built".to_string()))?;

        let inputs = self
            .input_names
            .iter()
            .map(|name| self.scalar(name))
            .collect::<BmiResult<Vec<f32>>>()?;
        let row = Array2::from_shape_vec((1, inputs.len()), inputs)
            .map_err(|e| BmiError::Error(e.to_string()))?;
        let outputs = network.forward(row.view())?;

        if outputs.ncols() != self.output_names.len() {
            return Err(BmiError::Error(format!(
                "network produced {} outputs for {} output variables",
                outputs.ncols(),
                self.output_names.len()
            )));
        }
        for (name, output) in self.output_names.iter().zip(outputs.row(0)) {
            let value = self
                .values
                .get_mut(name)
                .and_then(|v| v.as_array_mut::<f32>())
                .ok_or_else(|| BmiError::UnknownVariable(name.clone()))?;
            value.fill(*output);
        }

        self.time.advance();
        debug!(
            "Updated {} to time {} {}",
            self.get_component_name(),
            self.time.current_time,
            self.time.units
        );
        Ok(())
    }

    fn update_until(&mut self, time: f64) -> BmiResult<()> {
        self.state.require(ModelState::Initialized)?;
        let steps = self.steps_until(time)?;
        if steps < 0 {
            warn!(
                "update_until target {} is behind the current time {}",
                time, self.time.current_time
            );
            return Ok(());
        }
        for _ in 0..steps {
            self.update()?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> BmiResult<()> {
        match self.state {
            ModelState::Uninitialized => {
                warn!("finalize called on a model that was never initialized")
            }
            ModelState::Initialized => info!("Finalized {}", self.get_component_name()),
            ModelState::Finalized => debug!("{} is already finalized", self.get_component_name()),
        }
        self.network = None;
        self.state = ModelState::Finalized;
        Ok(())
    }

    fn get_input_item_count(&self) -> BmiResult<usize> {
        Ok(self.input_names.len())
    }

    fn get_output_item_count(&self) -> BmiResult<usize> {
        Ok(self.output_names.len())
    }

    fn get_input_var_names(&self) -> BmiResult<&[String]> {
        Ok(&self.input_names)
    }

    fn get_output_var_names(&self) -> BmiResult<&[String]> {
        Ok(&self.output_names)
    }

    fn get_var_grid(&self, name: &str) -> BmiResult<GridId> {
        self.value(name)?;
        Ok(self.grid.id())
    }

    fn get_var_units(&self, name: &str) -> BmiResult<&str> {
        self.units_of(name)
    }

    fn get_var_itemsize(&self, name: &str) -> BmiResult<usize> {
        Ok(self.value(name)?.itemsize())
    }

    fn get_var_location(&self, name: &str) -> BmiResult<GridLocation> {
        self.value(name)?;
        Ok(GridLocation::Node)
    }

    fn get_current_time(&self) -> BmiResult<f64> {
        Ok(self.time.current_time)
    }

    fn get_start_time(&self) -> BmiResult<f64> {
        Ok(self.time.start_time)
    }

    fn get_end_time(&self) -> BmiResult<f64> {
        Ok(self.time.end_time)
    }

    fn get_time_units(&self) -> BmiResult<TimeUnits> {
        Ok(self.time.units)
    }

    fn get_time_step(&self) -> BmiResult<f64> {
        Ok(self.time.time_step)
    }

    fn get_value_ptr(&self, name: &str) -> BmiResult<ValueRef<'_>> {
        self.value(name)?.flat(name)
    }

    fn get_value_ptr_mut(&mut self, name: &str) -> BmiResult<ValueMut<'_>> {
        self.value_mut(name)?.flat_mut(name)
    }

    fn get_value_at_indices(
        &self,
        name: &str,
        mut dest: ValueMut<'_>,
        indices: &[usize],
    ) -> BmiResult<()> {
        let src = self.get_value_ptr(name)?;
        dest.gather_from(name, src, indices)
    }

    fn set_value(&mut self, name: &str, src: ValueRef<'_>) -> BmiResult<()> {
        self.get_value_ptr_mut(name)?.copy_from(name, src)
    }

    fn set_value_at_indices(
        &mut self,
        name: &str,
        indices: &[usize],
        src: ValueRef<'_>,
    ) -> BmiResult<()> {
        self.get_value_ptr_mut(name)?.scatter_from(name, indices, src)
    }

    fn get_grid_rank(&self, grid: GridId) -> BmiResult<usize> {
        Ok(self.check_grid(grid)?.rank())
    }

    fn get_grid_size(&self, grid: GridId) -> BmiResult<usize> {
        Ok(self.check_grid(grid)?.size())
    }

    fn get_grid_type(&self, grid: GridId) -> BmiResult<GridType> {
        Ok(self.check_grid(grid)?.grid_type())
    }

    fn get_grid_shape(&self, grid: GridId, shape: &mut [usize]) -> BmiResult<()> {
        let grid = self.check_grid(grid)?;
        if shape.len() != grid.rank() {
            return Err(BmiError::BufferMismatch {
                name: format!("grid {}", grid.id()),
                expected: format!("{} elements", grid.rank()),
                found: format!("{} elements", shape.len()),
            });
        }
        shape.copy_from_slice(grid.shape());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn initialized(config: Config) -> BmiModel {
        let mut model = BmiModel::new();
        model.initialize_with_config(config).unwrap();
        model
    }

    fn set_scalar(model: &mut BmiModel, name: &str, value: f32) {
        model
            .set_value(name, ValueRef::from(&[value][..]))
            .unwrap();
    }

    #[test]
    fn construction_declares_defaults() {
        let model = BmiModel::new();
        assert_eq!(model.state(), ModelState::Uninitialized);
        assert_eq!(model.get_input_var_names().unwrap(), &["precipitation"]);
        assert_eq!(model.get_output_var_names().unwrap(), &["runoff"]);
        assert_eq!(model.get_var_units("runoff").unwrap(), "-");
        assert_eq!(model.get_var_itemsize("precipitation").unwrap(), 4);
        assert_eq!(model.get_var_nbytes("precipitation").unwrap(), 4);
        assert_eq!(model.scalar("runoff").unwrap(), 0.0);
    }

    #[test]
    fn update_matches_network() {
        let mut model = initialized(Config::default());
        set_scalar(&mut model, "precipitation", 2.0);
        model.update().unwrap();

        let network = FeedForward::from_config(&Config::default()).unwrap();
        let expected = network
            .forward(Array2::from_elem((1, 1), 2.0_f32).view())
            .unwrap();
        assert!(is_close!(
            model.scalar("runoff").unwrap() as f64,
            expected[[0, 0]] as f64
        ));
        assert!(is_close!(model.get_current_time().unwrap(), 3600.0));
    }

    #[test]
    fn multiple_inputs_and_outputs() {
        let config = Config {
            input_variable: vec!["a".into(), "b".into()],
            input_size: 2,
            output_variable: vec!["x".into(), "y".into(), "z".into()],
            output_size: 3,
            hidden_size: vec![5],
            ..Config::default()
        };
        let mut model = initialized(config.clone());
        set_scalar(&mut model, "a", 1.0);
        set_scalar(&mut model, "b", -1.0);
        model.update().unwrap();

        let expected = FeedForward::from_config(&config)
            .unwrap()
            .forward(ndarray::array![[1.0_f32, -1.0]].view())
            .unwrap();
        for (j, name) in ["x", "y", "z"].iter().enumerate() {
            assert!(is_close!(
                model.scalar(name).unwrap() as f64,
                expected[[0, j]] as f64
            ));
        }
        // Default names are no longer declared
        assert!(model.get_var_grid("precipitation").unwrap_err().is_unknown_variable());
    }

    #[test]
    fn update_until_stops_before_passing_target() {
        let mut model = initialized(Config::default());
        model.update_until(3.5 * 3600.0).unwrap();
        assert!(is_close!(model.get_current_time().unwrap(), 3.0 * 3600.0));

        model.update_until(4.0 * 3600.0).unwrap();
        assert!(is_close!(model.get_current_time().unwrap(), 4.0 * 3600.0));

        // Target behind the current time leaves the model untouched
        model.update_until(0.0).unwrap();
        assert!(is_close!(model.get_current_time().unwrap(), 4.0 * 3600.0));
    }

    #[test]
    fn update_until_reaches_target_with_inexact_step() {
        let mut config = Config::default();
        config.time = BmiTime::new(0.0, 0.0, 1.0, "s", 0.1).unwrap();
        let mut model = initialized(config);
        model.update_until(0.3).unwrap();
        assert!(is_close!(model.get_current_time().unwrap(), 0.3));

        let mut config = Config::default();
        config.time = BmiTime::new(0.0, 0.0, 1.0, "s", 1.0 / 3.0).unwrap();
        let mut model = initialized(config);
        model.update_until(1.0).unwrap();
        assert!(is_close!(model.get_current_time().unwrap(), 1.0));
    }

    #[test]
    fn update_until_rejects_non_finite_target() {
        let mut model = initialized(Config::default());
        for target in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = model.update_until(target).unwrap_err();
            assert!(matches!(err, BmiError::Error(_)));
        }
        // The default end time is unbounded
        assert!(model.update_until(model.get_end_time().unwrap()).is_err());
        assert_eq!(model.get_current_time().unwrap(), 0.0);
    }

    #[test]
    fn update_until_backwards() {
        let mut config = Config::default();
        config.time = BmiTime::new(10.0, 10.0, 0.0, "d", -1.0).unwrap();
        let mut model = initialized(config);
        model.update_until(7.5).unwrap();
        assert!(is_close!(model.get_current_time().unwrap(), 8.0));
        assert_eq!(model.get_time_units().unwrap(), TimeUnits::Days);
    }

    #[test]
    fn lifecycle_is_enforced() {
        let mut model = BmiModel::new();
        assert!(matches!(model.update(), Err(BmiError::InvalidState { .. })));
        assert!(matches!(
            model.update_until(10.0),
            Err(BmiError::InvalidState { .. })
        ));

        model.initialize("").unwrap();
        assert!(matches!(
            model.initialize(""),
            Err(BmiError::InvalidState { .. })
        ));

        model.finalize().unwrap();
        model.finalize().unwrap();
        assert_eq!(model.state(), ModelState::Finalized);
        assert!(matches!(model.update(), Err(BmiError::InvalidState { .. })));
    }

    #[test]
    fn indexed_access() {
        let mut model = BmiModel::new();
        model
            .set_value_at_indices("precipitation", &[0], ValueRef::from(&[3.0_f32][..]))
            .unwrap();
        let mut dest = vec![0.0_f32];
        model
            .get_value_at_indices("precipitation", (&mut dest).into(), &[0])
            .unwrap();
        assert_eq!(dest, vec![3.0]);

        let err = model
            .get_value_at_indices("precipitation", (&mut dest).into(), &[1])
            .unwrap_err();
        assert!(matches!(err, BmiError::BufferMismatch { .. }));
    }

    #[test]
    fn set_value_rejects_wrong_type() {
        let mut model = BmiModel::new();
        let err = model
            .set_value("precipitation", ValueRef::from(&[1.0_f64][..]))
            .unwrap_err();
        assert!(matches!(err, BmiError::BufferMismatch { .. }));
        assert_eq!(model.scalar("precipitation").unwrap(), 0.0);
    }

    #[test]
    fn grid_queries() {
        let model = BmiModel::new();
        assert_eq!(model.get_grid_rank(0).unwrap(), 0);
        assert_eq!(model.get_grid_size(0).unwrap(), 1);
        assert_eq!(model.get_grid_type(0).unwrap(), GridType::Scalar);
        model.get_grid_shape(0, &mut []).unwrap();
        assert_eq!(model.get_grid_rank(1).unwrap_err(), BmiError::UnknownGrid(1));

        let mut x = [0.0_f64; 1];
        assert!(model.get_grid_x(0, &mut x).unwrap_err().is_not_implemented());
        assert!(model.get_grid_node_count(0).unwrap_err().is_not_implemented());
    }

    #[test]
    fn variable_descriptor_views_storage() {
        let mut model = BmiModel::new();
        set_scalar(&mut model, "precipitation", 1.25);

        let variable = model.variable("precipitation").unwrap();
        assert!(variable.value().is_view());
        assert!(variable.grid().is_scalar());
        assert_eq!(variable.nbytes(), variable.itemsize());
        let flat = variable.value().flat("precipitation").unwrap();
        assert_eq!(flat.as_slice::<f32>().unwrap(), &[1.25]);

        assert!(model.variable("unknown_var").unwrap_err().is_unknown_variable());
    }
}
