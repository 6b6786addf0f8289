use thiserror::Error;

use crate::validation::ValidationErrors;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents one or more fields failing validation.
    #[error("Invalid request: {0}")]
    InvalidFields(ValidationErrors),

    /// Represents a request body that could not be parsed as JSON.
    #[error("Malformed payload")]
    MalformedPayload(#[source] serde_json::Error),

    /// Represents a failure to build the URL of a stored recipe.
    #[error("Failed to generate URL")]
    FailedToGenerateUrl { source: url::ParseError },

    /// Represents a write rejected by a database constraint.
    #[error("Constraint violated: {constraint}")]
    ConstraintViolation { constraint: String },

    /// Represents a failure to reach the database at all.
    #[error("Store unavailable")]
    StoreUnavailable { source: sqlx::Error },

    /// Represents any other SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },
}

impl From<ValidationErrors> for BackendError {
    fn from(errors: ValidationErrors) -> Self {
        BackendError::InvalidFields(errors)
    }
}
