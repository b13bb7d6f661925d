use thiserror::Error;

/// Rejections raised by input validation and record lookups.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    LimitReached(String),
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::LimitReached(_) => "limit_reached",
            _ => "bad_params",
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
