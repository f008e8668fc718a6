//! Uniform success/failure envelope for HTTP APIs.
//!
//! Every response body has the same four fields:
//!
//! ```json
//! { "data": <T|null>, "isSuccessful": bool, "statusCode": <int>, "errorMessages": [string]|null }
//! ```
//!
//! Services return [`ApiResult`] values; handlers hand them straight to axum,
//! which uses `statusCode` as the response status.

mod ext;
mod result;

pub use ext::{ApiResultFutureExt, IntoApiResult, SuccessExt};
pub use result::{ApiResult, InvalidApiResult};

pub use axum::http::StatusCode;
