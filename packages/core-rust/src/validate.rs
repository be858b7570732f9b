//! Caller-input validation.

/// A caller-supplied input violates a documented constraint.
///
/// Always recoverable by the caller: fix the input and retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("id cannot be empty")]
    MissingId,
    #[error("limit {limit} is greater than {max}")]
    LimitTooLarge { limit: u32, max: u32 },
    #[error("unknown filter key: {0}")]
    UnknownFilter(String),
}

/// Request types that carry their own input constraints.
pub trait Validate {
    /// # Errors
    ///
    /// Returns the first violated constraint.
    fn validate(&self) -> Result<(), ValidationError>;
}
