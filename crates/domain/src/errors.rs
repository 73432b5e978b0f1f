use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Field-level schema violations; the message is already formatted.
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid {field}: {value}. Please provide a valid value.")]
    InvalidId { field: String, value: String },

    #[error("Duplicate field value: {{\"{field}\":\"{value}\"}}. Please use another value.")]
    DuplicateField { field: String, value: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn repository(err: impl std::fmt::Display) -> Self {
        Self::RepositoryError(err.to_string())
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "ValidationError",
            Self::InvalidRequest(_) => "InvalidRequestError",
            Self::InvalidId { .. } => "CastError",
            Self::DuplicateField { .. } => "DuplicateFieldError",
            Self::NotFound(_) => "NotFoundError",
            Self::Conflict(_) => "ConflictError",
            Self::RepositoryError(_) => "InternalError",
        }
    }
}
