use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use thiserror::Error;

use shared::error::{Error as DomainError, ErrorCode, ErrorResponse};
use shared::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0}")]
    RateLimited(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(err.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let (status, message) = match self {
            ApiError::Domain(err) => match err.code {
                ErrorCode::Validation => (Status::BadRequest, err.message),
                ErrorCode::NotFound => (Status::NotFound, err.message),
                ErrorCode::Conflict => (Status::Conflict, err.message),
                // storage detail stays inside the process
                ErrorCode::Store => (
                    Status::InternalServerError,
                    "An internal server error occurred.".into(),
                ),
            },
            ApiError::RateLimited(message) => (Status::TooManyRequests, message),
        };

        let body = Json(ErrorResponse { error: message }).respond_to(req)?;
        rocket::Response::build_from(body).status(status).ok()
    }
}
