//! Centralized error handling.
//!
//! Every failure ends up as an [`ApiResult`] failure, so clients always
//! receive the same envelope.

use api_result::ApiResult;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use data_access::DataError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found")]
    NotFound,

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Data access error: {0}")]
    Data(#[from] DataError),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Data(err) if err.is_missing() => StatusCode::NOT_FOUND,
            AppError::Data(DataError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing messages (hides internal details)
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            AppError::NotFound => vec![self.to_string()],
            AppError::BadRequest(msg) => vec![msg.clone()],
            AppError::Validation(messages) => messages.clone(),
            AppError::Data(err) if err.is_missing() => vec![AppError::NotFound.to_string()],
            AppError::Data(DataError::Cancelled) => vec!["Request was cancelled".to_string()],
            AppError::Data(e) => {
                tracing::error!("Database error: {:?}", e);
                vec!["A database error occurred".to_string()]
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                vec!["An internal error occurred".to_string()]
            }
        }
    }

    /// Convert into a failed response envelope.
    pub fn into_api_result<T>(self) -> ApiResult<T> {
        ApiResult::failure_many(self.status(), self.user_messages())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_api_result::<()>().into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Turn a service outcome into the envelope handlers return.
pub fn respond<T>(result: AppResult<T>) -> ApiResult<T> {
    match result {
        Ok(data) => ApiResult::success(data),
        Err(err) => err.into_api_result(),
    }
}

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn validation<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::Validation(messages.into_iter().map(Into::into).collect())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
