//! Variable descriptors
//!
//! A [`BmiVariable`] carries all the standard BMI metadata for one named model variable:
//! the grid it lives on, its data type, units, location on the grid and its value.
//!
//! Descriptors are only ever handed out in a consistent state. Every constructor and
//! every mutation runs the same validation:
//!
//! - a variable on a scalar grid must hold a rank 0 value;
//! - otherwise the value must have as many dimensions as the grid has rank, the same
//!   per-dimension sizes as the grid shape, and exactly `grid.size() * itemsize` bytes.
//!
//! `rank`, `itemsize` and `nbytes` are never stored; they are read from the grid and
//! the current value each time they are requested.
//!
//! # Example
//!
//! ```rust
//! use bmi_nn_core::grid::{Grid, GridType};
//! use bmi_nn_core::variable::BmiVariable;
//! use ndarray::Array2;
//! use std::sync::Arc;
//!
//! let grid = Arc::new(Grid::new(1, 2, GridType::UniformRectilinear, vec![2, 3]).unwrap());
//! let storage = Array2::<f64>::zeros((2, 3));
//!
//! let variable = BmiVariable::builder("soil_moisture")
//!     .grid(grid.clone())
//!     .units("m3 m-3")
//!     .value(storage.view())
//!     .build()
//!     .unwrap();
//! assert_eq!(variable.rank(), 2);
//! assert_eq!(variable.nbytes(), 48);
//!
//! // A value that does not match the grid is rejected
//! let wrong = BmiVariable::builder("soil_moisture")
//!     .grid(grid)
//!     .value(Array2::<f64>::zeros((3, 2)))
//!     .build();
//! assert!(wrong.is_err());
//! ```

use crate::errors::{BmiError, BmiResult};
use crate::grid::Grid;
use crate::value::{ValueType, VariableValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Location of a variable's values relative to its grid
///
/// See <https://bmi.readthedocs.io/en/stable/#get-var-location>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridLocation {
    #[default]
    Node,
    Edge,
    Face,
}

impl GridLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridLocation::Node => "node",
            GridLocation::Edge => "edge",
            GridLocation::Face => "face",
        }
    }
}

impl fmt::Display for GridLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GridLocation {
    type Err = BmiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(GridLocation::Node),
            "edge" => Ok(GridLocation::Edge),
            "face" => Ok(GridLocation::Face),
            other => Err(BmiError::Validation(format!(
                "'{}' is not a grid location, expected one of node, edge, face",
                other
            ))),
        }
    }
}

/// Units used when a variable does not declare any
pub const DIMENSIONLESS: &str = "-";

/// Metadata and value of a single BMI variable
///
/// The value is usually a borrowed view of storage owned by the model adapter, so a
/// descriptor reflects the live buffer rather than a copy of it.
#[derive(Debug, Clone)]
pub struct BmiVariable<'a> {
    name: String,
    grid: Arc<Grid>,
    value_type: ValueType,
    units: String,
    value: VariableValue<'a>,
    location: GridLocation,
}

impl<'a> BmiVariable<'a> {
    /// Start building a variable called `name`
    pub fn builder(name: impl Into<String>) -> BmiVariableBuilder<'a> {
        BmiVariableBuilder {
            name: name.into(),
            grid: None,
            value_type: None,
            units: None,
            value: None,
            location: GridLocation::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn value(&self) -> &VariableValue<'a> {
        &self.value
    }

    pub fn location(&self) -> GridLocation {
        self.location
    }

    /// Rank of the grid associated with the variable
    pub fn rank(&self) -> usize {
        self.grid.rank()
    }

    /// Size of a single element of the value, in bytes
    pub fn itemsize(&self) -> usize {
        self.value.itemsize()
    }

    /// Total number of bytes used by the value
    pub fn nbytes(&self) -> usize {
        self.value.nbytes()
    }

    /// Replace the value, keeping the current one if the new value is inconsistent
    /// with the grid or the declared type.
    pub fn set_value(&mut self, value: impl Into<VariableValue<'a>>) -> BmiResult<()> {
        let value = value.into();
        validate(&self.name, &self.grid, self.value_type, &value)?;
        self.value = value;
        Ok(())
    }

    /// Move the variable onto another grid, keeping the current one if the value does
    /// not fit the new grid.
    pub fn set_grid(&mut self, grid: Arc<Grid>) -> BmiResult<()> {
        validate(&self.name, &grid, self.value_type, &self.value)?;
        self.grid = grid;
        Ok(())
    }

    pub fn set_units(&mut self, units: impl Into<String>) {
        self.units = units.into();
    }

    pub fn set_location(&mut self, location: GridLocation) {
        self.location = location;
    }

    /// Detach the descriptor from the storage it borrows
    pub fn into_owned(self) -> BmiVariable<'static> {
        BmiVariable {
            name: self.name,
            grid: self.grid,
            value_type: self.value_type,
            units: self.units,
            value: self.value.into_owned().into(),
            location: self.location,
        }
    }
}

/// Builder for [`BmiVariable`]
///
/// Unset fields take the BMI defaults: a fresh scalar grid with id 0, the type of the
/// supplied value (float32 when no value is given), units of `"-"`, a zero scalar
/// value and a node location.
#[derive(Debug)]
pub struct BmiVariableBuilder<'a> {
    name: String,
    grid: Option<Arc<Grid>>,
    value_type: Option<ValueType>,
    units: Option<String>,
    value: Option<VariableValue<'a>>,
    location: GridLocation,
}

impl<'a> BmiVariableBuilder<'a> {
    pub fn grid(mut self, grid: Arc<Grid>) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn value(mut self, value: impl Into<VariableValue<'a>>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn location(mut self, location: GridLocation) -> Self {
        self.location = location;
        self
    }

    /// Resolve defaults and validate the variable
    ///
    /// # Errors
    ///
    /// Returns [`BmiError::Validation`] naming the variable together with the expected and
    /// actual shape or rank when the value does not fit the grid.
    pub fn build(self) -> BmiResult<BmiVariable<'a>> {
        let grid = self.grid.unwrap_or_else(|| Arc::new(Grid::scalar(0)));
        let value = match self.value {
            Some(value) => value,
            None => VariableValue::zeros(self.value_type.unwrap_or_default(), &[]),
        };
        let value_type = self.value_type.unwrap_or_else(|| value.value_type());

        validate(&self.name, &grid, value_type, &value)?;

        Ok(BmiVariable {
            name: self.name,
            grid,
            value_type,
            units: self.units.unwrap_or_else(|| DIMENSIONLESS.to_string()),
            value,
            location: self.location,
        })
    }
}

/// Checks the variable name, value type, rank, shape and size are all compatible
fn validate(
    name: &str,
    grid: &Grid,
    value_type: ValueType,
    value: &VariableValue<'_>,
) -> BmiResult<()> {
    if name.is_empty() {
        return Err(BmiError::Validation(
            "variable name must not be empty".to_string(),
        ));
    }
    if value.value_type() != value_type {
        return Err(BmiError::Validation(format!(
            "{} declares type {}, but has value of type {}",
            name,
            value_type,
            value.value_type()
        )));
    }
    if grid.is_scalar() {
        if value.ndim() != 0 {
            return Err(BmiError::Validation(format!(
                "{} is associated with scalar grid {}, but has value shape {:?}",
                name,
                grid.id(),
                value.shape()
            )));
        }
        return Ok(());
    }
    if value.ndim() != grid.rank() {
        return Err(BmiError::Validation(format!(
            "{} is associated with grid {} of rank {}, but value has {} dimensions",
            name,
            grid.id(),
            grid.rank(),
            value.ndim()
        )));
    }
    if value.shape() != grid.shape() {
        return Err(BmiError::Validation(format!(
            "{} is associated with grid of shape {:?}, but has value of shape {:?}",
            name,
            grid.shape(),
            value.shape()
        )));
    }
    if value.nbytes() != grid.size() * value.itemsize() {
        return Err(BmiError::Validation(format!(
            "{} grid size {} does not match the {} bytes required for its value",
            name,
            grid.size(),
            value.nbytes()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridType;
    use crate::value::Value;
    use ndarray::{array, Array2, ArrayD, IxDyn};

    #[test]
    fn variable_create_defaults() {
        let variable = BmiVariable::builder("test").build().unwrap();
        assert_eq!(variable.name(), "test");
        assert!(variable.grid().is_scalar());
        assert_eq!(variable.grid().id(), 0);
        assert_eq!(variable.value_type(), ValueType::Float32);
        assert_eq!(variable.units(), "-");
        assert_eq!(variable.location(), GridLocation::Node);
        assert_eq!(variable.rank(), 0);
        assert_eq!(variable.itemsize(), 4);
        assert_eq!(variable.nbytes(), variable.itemsize());
    }

    #[test]
    fn empty_name_is_rejected() {
        let result = BmiVariable::builder("").build();
        assert!(matches!(result, Err(BmiError::Validation(_))));
    }

    #[test]
    fn default_grid_rejects_array_value() {
        let result = BmiVariable::builder("test")
            .value(ArrayD::<f64>::zeros(IxDyn(&[1, 1])))
            .build();
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: test is associated with scalar grid 0, but has value shape [1, 1]"
        );
    }

    #[test]
    fn rank_mismatch_message() {
        let grid = Arc::new(Grid::new(2, 2, GridType::UniformRectilinear, vec![2, 2]).unwrap());
        let err = BmiVariable::builder("runoff")
            .grid(grid)
            .value(array![1.0_f32, 2.0, 3.0, 4.0])
            .build()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("runoff is associated with grid 2 of rank 2"));
        assert!(msg.contains("value has 1 dimensions"));
    }

    #[test]
    fn shape_mismatch_message() {
        let grid = Arc::new(Grid::new(1, 2, GridType::UniformRectilinear, vec![2, 3]).unwrap());
        let err = BmiVariable::builder("runoff")
            .grid(grid)
            .value(Array2::<f32>::zeros((3, 2)))
            .build()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("runoff"));
        assert!(msg.contains("[2, 3]"));
        assert!(msg.contains("[3, 2]"));
    }

    #[test]
    fn explicit_type_must_match_value() {
        let err = BmiVariable::builder("precipitation")
            .value_type(ValueType::Float64)
            .value(VariableValue::scalar(0.0_f32))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("declares type float64"));

        let variable = BmiVariable::builder("count")
            .value_type(ValueType::Int64)
            .build()
            .unwrap();
        assert_eq!(variable.itemsize(), 8);
    }

    #[test]
    fn value_aliases_storage() {
        let grid = Arc::new(Grid::new(1, 1, GridType::Vector, vec![3]).unwrap());
        let storage = Value::from(array![1.0_f64, 2.0, 3.0]);
        let variable = BmiVariable::builder("flow")
            .grid(grid)
            .value(storage.view())
            .build()
            .unwrap();
        assert!(variable.value().is_view());
        assert_eq!(variable.nbytes(), 24);

        let owned = variable.into_owned();
        assert!(!owned.value().is_view());
        assert_eq!(owned.nbytes(), 24);
    }

    #[test]
    fn derived_sizes_follow_new_value() {
        let grid = Arc::new(Grid::new(1, 1, GridType::Vector, vec![2]).unwrap());
        let mut variable = BmiVariable::builder("flow")
            .grid(grid)
            .value_type(ValueType::Float64)
            .value(array![0.0_f64, 0.0])
            .build()
            .unwrap();
        assert_eq!(variable.nbytes(), 16);

        variable.set_value(array![5.0_f64, 6.0]).unwrap();
        assert_eq!(variable.nbytes(), 16);
        assert_eq!(variable.itemsize(), 8);
    }

    #[test]
    fn failed_mutation_keeps_previous_state() {
        let grid = Arc::new(Grid::new(1, 1, GridType::Vector, vec![2]).unwrap());
        let mut variable = BmiVariable::builder("flow")
            .grid(grid)
            .value(array![1.0_f32, 2.0])
            .build()
            .unwrap();

        assert!(variable.set_value(array![1.0_f32, 2.0, 3.0]).is_err());
        assert_eq!(variable.value().shape(), &[2]);

        assert!(variable.set_grid(Arc::new(Grid::scalar(0))).is_err());
        assert_eq!(variable.grid().id(), 1);

        let wider = Arc::new(Grid::new(3, 2, GridType::UniformRectilinear, vec![1, 2]).unwrap());
        assert!(variable.set_grid(wider).is_err());
        assert_eq!(variable.rank(), 1);
    }

    #[test]
    fn location_parsing() {
        assert_eq!("face".parse::<GridLocation>().unwrap(), GridLocation::Face);
        assert_eq!(GridLocation::Edge.to_string(), "edge");
        assert!("cell".parse::<GridLocation>().is_err());
        assert_eq!(
            serde_json::to_string(&GridLocation::Node).unwrap(),
            "\"node\""
        );
    }
}
