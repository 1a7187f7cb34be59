pub mod bmi;
pub mod errors;
pub mod grid;
pub mod python;
pub mod time;
pub mod value;
pub mod variable;

pub use bmi::{Bmi, ModelState};
pub use errors::{BmiError, BmiResult};
pub use grid::{Grid, GridId, GridType};
pub use time::{BmiTime, TimeUnits};
pub use value::{Element, Value, ValueMut, ValueRef, ValueType, VariableValue};
pub use variable::{BmiVariable, GridLocation};
