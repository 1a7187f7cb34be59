//! The Basic Model Interface
//!
//! [`Bmi`] is the full set of BMI operations. Only the lifecycle (`initialize`, `update`)
//! and the flat value accessor [`Bmi::get_value_ptr`] must be provided by a model.
//! A handful of operations have defaults derived from the accessor; everything else
//! fails with [`BmiError::NotImplemented`] until the model overrides it, which lets
//! a caller discover which capabilities a model supports.
//!
//! ```rust
//! use bmi_nn_core::bmi::Bmi;
//! use bmi_nn_core::errors::{BmiError, BmiResult};
//! use bmi_nn_core::value::{Value, ValueRef};
//!
//! struct Constant(Value);
//!
//! impl Bmi for Constant {
//!     fn initialize(&mut self, _config_file: &str) -> BmiResult<()> {
//!         Ok(())
//!     }
//!
//!     fn update(&mut self) -> BmiResult<()> {
//!         Ok(())
//!     }
//!
//!     fn get_value_ptr(&self, name: &str) -> BmiResult<ValueRef<'_>> {
//!         match name {
//!             "level" => self.0.flat(name),
//!             _ => Err(BmiError::UnknownVariable(name.to_string())),
//!         }
//!     }
//! }
//!
//! let model = Constant(Value::scalar(2.5_f64));
//! assert_eq!(model.get_component_name(), "Constant");
//! assert_eq!(model.get_var_nbytes("level").unwrap(), 8);
//! assert!(model.get_grid_rank(0).unwrap_err().is_not_implemented());
//! ```

use crate::errors::{BmiError, BmiResult};
use crate::grid::{GridId, GridType};
use crate::time::TimeUnits;
use crate::value::{ValueMut, ValueRef, ValueType};
use crate::variable::GridLocation;
use std::fmt;

/// Lifecycle state of a model
///
/// `Uninitialized -> Initialized -> Finalized`. The trait does not track state itself;
/// concrete models use this to reject calls made in the wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelState {
    #[default]
    Uninitialized,
    Initialized,
    Finalized,
}

impl ModelState {
    /// Fail with [`BmiError::InvalidState`] unless the model is in `expected`
    pub fn require(&self, expected: ModelState) -> BmiResult<()> {
        if *self == expected {
            Ok(())
        } else {
            Err(BmiError::InvalidState {
                expected: expected.to_string(),
                found: self.to_string(),
            })
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Initialized => "initialized",
            ModelState::Finalized => "finalized",
        };
        write!(f, "{}", name)
    }
}

/// A numerical model exposed through BMI
///
/// The trait is object safe so heterogeneous models can be driven as `Box<dyn Bmi>`.
/// Array results are written into caller supplied slices; their lengths must match
/// the size reported by the corresponding count or size query.
pub trait Bmi {
    // Lifecycle

    /// Prepare the model for time stepping using a configuration file
    ///
    /// An empty path selects the model's built-in defaults.
    fn initialize(&mut self, config_file: &str) -> BmiResult<()>;

    /// Advance the model by a single time step
    fn update(&mut self) -> BmiResult<()>;

    /// Advance the model until it reaches `time`
    fn update_until(&mut self, _time: f64) -> BmiResult<()> {
        Err(BmiError::NotImplemented("update_until"))
    }

    /// Release any resources held by the model
    ///
    /// Safe to call more than once and on a model that never acquired anything.
    fn finalize(&mut self) -> BmiResult<()> {
        Ok(())
    }

    // Model information

    /// Name of the model, defaulting to the name of the implementing type
    ///
    /// Module paths and generic arguments are dropped, so `a::Model<b::Input>`
    /// becomes `Model`.
    fn get_component_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    fn get_input_item_count(&self) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_input_item_count"))
    }

    fn get_output_item_count(&self) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_output_item_count"))
    }

    /// Names of the input variables, in a stable order
    fn get_input_var_names(&self) -> BmiResult<&[String]> {
        Err(BmiError::NotImplemented("get_input_var_names"))
    }

    /// Names of the output variables, in a stable order
    fn get_output_var_names(&self) -> BmiResult<&[String]> {
        Err(BmiError::NotImplemented("get_output_var_names"))
    }

    // Variable information

    fn get_var_grid(&self, _name: &str) -> BmiResult<GridId> {
        Err(BmiError::NotImplemented("get_var_grid"))
    }

    /// Element type of a variable, read from its flat buffer
    fn get_var_type(&self, name: &str) -> BmiResult<ValueType> {
        Ok(self.get_value_ptr(name)?.value_type())
    }

    fn get_var_units(&self, _name: &str) -> BmiResult<&str> {
        Err(BmiError::NotImplemented("get_var_units"))
    }

    fn get_var_itemsize(&self, _name: &str) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_var_itemsize"))
    }

    /// Size of a variable's buffer in bytes, read from its flat buffer
    fn get_var_nbytes(&self, name: &str) -> BmiResult<usize> {
        Ok(self.get_value_ptr(name)?.nbytes())
    }

    fn get_var_location(&self, _name: &str) -> BmiResult<GridLocation> {
        Err(BmiError::NotImplemented("get_var_location"))
    }

    // Time information

    fn get_current_time(&self) -> BmiResult<f64> {
        Err(BmiError::NotImplemented("get_current_time"))
    }

    fn get_start_time(&self) -> BmiResult<f64> {
        Err(BmiError::NotImplemented("get_start_time"))
    }

    fn get_end_time(&self) -> BmiResult<f64> {
        Err(BmiError::NotImplemented("get_end_time"))
    }

    fn get_time_units(&self) -> BmiResult<TimeUnits> {
        Err(BmiError::NotImplemented("get_time_units"))
    }

    fn get_time_step(&self) -> BmiResult<f64> {
        Err(BmiError::NotImplemented("get_time_step"))
    }

    // Variable getters and setters

    /// Flat view of a variable's live storage
    ///
    /// # Errors
    ///
    /// - [`BmiError::UnknownVariable`] if `name` is not an input or output of the model
    /// - [`BmiError::NonCopyableLayout`] if the storage cannot be viewed as a flat slice
    ///   without copying
    fn get_value_ptr(&self, name: &str) -> BmiResult<ValueRef<'_>>;

    /// Mutable flat view of a variable's live storage
    ///
    /// Writes through the returned slice are visible to the model.
    fn get_value_ptr_mut(&mut self, _name: &str) -> BmiResult<ValueMut<'_>> {
        Err(BmiError::NotImplemented("get_value_ptr_mut"))
    }

    /// Copy a variable's values into `dest`
    fn get_value(&self, name: &str, mut dest: ValueMut<'_>) -> BmiResult<()> {
        let src = self.get_value_ptr(name)?;
        dest.copy_from(name, src)
    }

    /// Copy the values at the given flat indices into `dest`
    fn get_value_at_indices(
        &self,
        _name: &str,
        _dest: ValueMut<'_>,
        _indices: &[usize],
    ) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_value_at_indices"))
    }

    /// Overwrite a variable's values with `src`
    fn set_value(&mut self, _name: &str, _src: ValueRef<'_>) -> BmiResult<()> {
        Err(BmiError::NotImplemented("set_value"))
    }

    /// Overwrite the values at the given flat indices with `src`
    fn set_value_at_indices(
        &mut self,
        _name: &str,
        _indices: &[usize],
        _src: ValueRef<'_>,
    ) -> BmiResult<()> {
        Err(BmiError::NotImplemented("set_value_at_indices"))
    }

    // Grid information

    fn get_grid_rank(&self, _grid: GridId) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_grid_rank"))
    }

    fn get_grid_size(&self, _grid: GridId) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_grid_size"))
    }

    fn get_grid_type(&self, _grid: GridId) -> BmiResult<GridType> {
        Err(BmiError::NotImplemented("get_grid_type"))
    }

    // Uniform rectilinear

    fn get_grid_shape(&self, _grid: GridId, _shape: &mut [usize]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_shape"))
    }

    fn get_grid_spacing(&self, _grid: GridId, _spacing: &mut [f64]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_spacing"))
    }

    fn get_grid_origin(&self, _grid: GridId, _origin: &mut [f64]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_origin"))
    }

    // Non-uniform rectilinear, curvilinear

    fn get_grid_x(&self, _grid: GridId, _x: &mut [f64]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_x"))
    }

    fn get_grid_y(&self, _grid: GridId, _y: &mut [f64]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_y"))
    }

    fn get_grid_z(&self, _grid: GridId, _z: &mut [f64]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_z"))
    }

    // Unstructured

    fn get_grid_node_count(&self, _grid: GridId) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_grid_node_count"))
    }

    fn get_grid_edge_count(&self, _grid: GridId) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_grid_edge_count"))
    }

    fn get_grid_face_count(&self, _grid: GridId) -> BmiResult<usize> {
        Err(BmiError::NotImplemented("get_grid_face_count"))
    }

    fn get_grid_edge_nodes(&self, _grid: GridId, _edge_nodes: &mut [usize]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_edge_nodes"))
    }

    fn get_grid_face_edges(&self, _grid: GridId, _face_edges: &mut [usize]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_face_edges"))
    }

    fn get_grid_face_nodes(&self, _grid: GridId, _face_nodes: &mut [usize]) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_face_nodes"))
    }

    fn get_grid_nodes_per_face(
        &self,
        _grid: GridId,
        _nodes_per_face: &mut [usize],
    ) -> BmiResult<()> {
        Err(BmiError::NotImplemented("get_grid_nodes_per_face"))
    }
}
