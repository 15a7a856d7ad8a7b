use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

use crate::lifecycle::TransitionError;
use crate::tally::TallyError;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Validation failed")]
    Validation,
    #[error("Resource not found")]
    NotFound,
    #[error("Resource conflict")]
    Conflict,
    #[error("Storage failure")]
    Store,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("{entity} does not exist"))
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Store, message)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::new(ErrorCode::Validation, err.to_string())
    }
}

impl From<TransitionError> for Error {
    fn from(err: TransitionError) -> Self {
        Self::new(ErrorCode::Conflict, err.to_string())
    }
}

impl<C: fmt::Debug> From<TallyError<C>> for Error {
    fn from(err: TallyError<C>) -> Self {
        Self::new(ErrorCode::Validation, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
