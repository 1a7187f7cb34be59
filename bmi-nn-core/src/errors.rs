use crate::grid::GridId;
use thiserror::Error;

/// Error type for BMI operations.
///
/// The variants are kept distinct so that a caller probing optional capabilities can
/// tell "this model does not support X" ([`BmiError::NotImplemented`]) apart from
/// "this model failed while doing X".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BmiError {
    #[error("{0}")]
    Error(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("No known variable in BMI model: {0}")]
    UnknownVariable(String),
    #[error("No known grid in BMI model: {0}")]
    UnknownGrid(GridId),
    #[error("BMI function `{0}` is not implemented by this model")]
    NotImplemented(&'static str),
    #[error("Cannot flatten array without copying -- variable '{0}' is not stored contiguously")]
    NonCopyableLayout(String),
    #[error("Buffer mismatch for '{name}'. Expected {expected}, got {found}")]
    BufferMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("Invalid model state. Expected {expected}, got {found}")]
    InvalidState { expected: String, found: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BmiError {
    /// True if the error signals a capability the model has not implemented.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, BmiError::NotImplemented(_))
    }

    /// True if the error was caused by an undeclared variable name.
    pub fn is_unknown_variable(&self) -> bool {
        matches!(self, BmiError::UnknownVariable(_))
    }
}

/// Convenience type for `Result<T, BmiError>`.
pub type BmiResult<T> = Result<T, BmiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_implemented_is_distinguishable() {
        let err = BmiError::NotImplemented("get_grid_x");
        assert!(err.is_not_implemented());
        assert!(!err.is_unknown_variable());
        assert_eq!(
            err.to_string(),
            "BMI function `get_grid_x` is not implemented by this model"
        );
    }

    #[test]
    fn unknown_variable_message() {
        let err = BmiError::UnknownVariable("var1".to_string());
        assert!(err.is_unknown_variable());
        assert!(!err.is_not_implemented());
        assert_eq!(err.to_string(), "No known variable in BMI model: var1");
    }

    #[test]
    fn non_copyable_layout_message() {
        let err = BmiError::NonCopyableLayout("runoff".to_string());
        assert!(err.to_string().starts_with("Cannot flatten array without copying"));
    }
}
