//! Model configuration
//!
//! Configuration is read from a TOML file. Every field is optional and falls back to
//! the defaults below, so an empty file (or an empty path given to `initialize`) gives
//! a one-input, one-output network.
//!
//! ```toml
//! input_variable = ["precipitation", "temperature"]
//! input_size = 2
//! output_variable = ["runoff"]
//! output_size = 1
//! hidden_size = [16, 8]
//! activation = "relu"
//! seed = 7
//!
//! [time]
//! units = "h"
//! time_step = 1.0
//! end_time = 240.0
//! ```

use bmi_nn_core::errors::{BmiError, BmiResult};
use bmi_nn_core::time::BmiTime;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::components::Activation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Names of the model inputs, in the order they are fed to the network
    pub input_variable: Vec<String>,
    /// Names of the model outputs, in the order the network produces them
    pub output_variable: Vec<String>,
    pub input_size: usize,
    pub output_size: usize,
    pub hidden_size: Vec<usize>,
    pub activation: Option<Activation>,
    /// Training settings. Accepted so that existing configuration files load, but
    /// unused because the network is never trained here.
    pub learning_rate: f64,
    pub epochs: usize,
    /// Seed for the weight initialisation
    pub seed: u64,
    pub time: BmiTime,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_variable: vec!["precipitation".to_string()],
            output_variable: vec!["runoff".to_string()],
            input_size: 1,
            output_size: 1,
            hidden_size: vec![10, 10],
            activation: None,
            learning_rate: 0.005,
            epochs: 800,
            seed: 42,
            time: BmiTime::default(),
        }
    }
}

impl Config {
    /// Read and validate a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> BmiResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BmiError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML configuration
    pub fn from_toml_str(contents: &str) -> BmiResult<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| BmiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the variable names agree with the network sizes
    pub fn validate(&self) -> BmiResult<()> {
        if self.input_size != self.input_variable.len() {
            return Err(BmiError::Config(format!(
                "input_size is {} but {} input variables are named",
                self.input_size,
                self.input_variable.len()
            )));
        }
        if self.output_size != self.output_variable.len() {
            return Err(BmiError::Config(format!(
                "output_size is {} but {} output variables are named",
                self.output_size,
                self.output_variable.len()
            )));
        }
        if self.input_size == 0 || self.output_size == 0 || self.hidden_size.contains(&0) {
            return Err(BmiError::Config(
                "input, output and hidden sizes must be non-zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in self.input_variable.iter().chain(&self.output_variable) {
            if name.is_empty() {
                return Err(BmiError::Config("variable names must not be empty".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(BmiError::Config(format!(
                    "variable '{}' is declared more than once",
                    name
                )));
            }
        }
        Ok(())
    }
}
