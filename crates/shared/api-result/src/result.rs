//! The `ApiResult<T>` envelope.

use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{
    de::{value::UnitDeserializer, IntoDeserializer},
    Deserialize, Deserializer, Serialize,
};
use thiserror::Error;

/// Outcome of a service operation, ready to be sent to a client.
///
/// A success carries an optional payload and no errors. A failure carries a
/// non-empty list of error messages and no payload. Values are immutable
/// once built; use the named constructors.
///
/// Serializes as:
///
/// ```json
/// { "data": ..., "isSuccessful": true, "statusCode": 200, "errorMessages": null }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    try_from = "RawApiResult<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct ApiResult<T> {
    data: Option<T>,
    is_successful: bool,
    status_code: u16,
    error_messages: Option<Vec<String>>,
}

impl<T> ApiResult<T> {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Successful result with status 200.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            is_successful: true,
            status_code: StatusCode::OK.as_u16(),
            error_messages: None,
        }
    }

    /// Failed result with a single error message.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self::failure_many(status, vec![message.into()])
    }

    /// Failed result with several error messages.
    ///
    /// An empty list is replaced by the status code's reason phrase, so a
    /// failure always explains itself.
    pub fn failure_many<I, S>(status: StatusCode, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut messages: Vec<String> = messages.into_iter().map(Into::into).collect();
        if messages.is_empty() {
            messages.push(reason_phrase(status).to_string());
        }

        Self {
            data: None,
            is_successful: false,
            status_code: status.as_u16(),
            error_messages: Some(messages),
        }
    }

    pub fn not_found() -> Self {
        Self::not_found_with("Resource not found")
    }

    pub fn not_found_with(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::unauthorized_with("Unauthorized access")
    }

    pub fn unauthorized_with(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden() -> Self {
        Self::forbidden_with("Forbidden access")
    }

    pub fn forbidden_with(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::FORBIDDEN, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Wrap a bare payload as a success.
    pub fn from_value(data: T) -> Self {
        Self::success(data)
    }

    /// `Ok` becomes a success, `Err` a 500 failure carrying the error's
    /// message.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::internal_error(err.to_string()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_successful(&self) -> bool {
        self.is_successful
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Status code as an HTTP status, falling back to 500 for codes outside
    /// the valid range.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn error_messages(&self) -> Option<&[String]> {
        self.error_messages.as_deref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Transform the payload of a success; failures pass through unchanged.
    pub fn map<U, F>(self, f: F) -> ApiResult<U>
    where
        F: FnOnce(T) -> U,
    {
        ApiResult {
            data: self.data.map(f),
            is_successful: self.is_successful,
            status_code: self.status_code,
            error_messages: self.error_messages,
        }
    }
}

impl<T> From<T> for ApiResult<T> {
    fn from(data: T) -> Self {
        Self::from_value(data)
    }
}

impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown error")
}

// =============================================================================
// Deserialization
// =============================================================================

/// Why a JSON payload is not a valid `ApiResult`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidApiResult {
    #[error("successful result must not carry error messages")]
    SuccessWithErrors,

    #[error("failed result must not carry data")]
    FailureWithData,

    #[error("failed result must carry at least one error message")]
    FailureWithoutErrors,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
struct RawApiResult<T> {
    #[serde(default, deserialize_with = "raw_data")]
    data: RawData<T>,
    is_successful: bool,
    status_code: u16,
    error_messages: Option<Vec<String>>,
}

/// The `data` field as written on the wire.
///
/// Payloads such as `()` or `Option<U>` serialize to `null` themselves, so a
/// `null` also keeps whatever `T` reads from a unit value.
enum RawData<T> {
    Null(Option<T>),
    Present(T),
}

impl<T> Default for RawData<T> {
    fn default() -> Self {
        RawData::Null(None)
    }
}

fn raw_data<'de, D, T>(deserializer: D) -> Result<RawData<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<T>::deserialize(deserializer)? {
        Some(value) => RawData::Present(value),
        None => {
            let unit: UnitDeserializer<D::Error> = ().into_deserializer();
            RawData::Null(T::deserialize(unit).ok())
        }
    })
}

impl<T> TryFrom<RawApiResult<T>> for ApiResult<T> {
    type Error = InvalidApiResult;

    fn try_from(raw: RawApiResult<T>) -> Result<Self, Self::Error> {
        let data = if raw.is_successful {
            if raw.error_messages.is_some() {
                return Err(InvalidApiResult::SuccessWithErrors);
            }
            match raw.data {
                RawData::Present(value) => Some(value),
                RawData::Null(unit) => unit,
            }
        } else {
            if matches!(raw.data, RawData::Present(_)) {
                return Err(InvalidApiResult::FailureWithData);
            }
            if raw.error_messages.as_ref().map_or(true, Vec::is_empty) {
                return Err(InvalidApiResult::FailureWithoutErrors);
            }
            None
        };

        Ok(Self {
            data,
            is_successful: raw.is_successful,
            status_code: raw.status_code,
            error_messages: raw.error_messages,
        })
    }
}
