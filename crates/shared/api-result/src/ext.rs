//! Adapters from plain values and fallible futures into [`ApiResult`].

use std::fmt::Display;
use std::future::Future;

use futures::future::{FutureExt, Map};

use crate::result::ApiResult;

/// Future returned by [`ApiResultFutureExt::into_api_result`].
pub type IntoApiResult<Fut, T, E> = Map<Fut, fn(Result<T, E>) -> ApiResult<T>>;

/// Wrap a fallible computation so it always resolves to an [`ApiResult`].
///
/// `Ok(value)` becomes a success; `Err(err)` becomes a 500 failure whose
/// only message is `err.to_string()`. This is the boundary where raw errors
/// stop propagating.
///
/// ```rust,ignore
/// let result: ApiResult<Product> = async { repo.first(cond).await }
///     .into_api_result()
///     .await;
/// ```
pub trait ApiResultFutureExt<T, E>: Future<Output = Result<T, E>> + Sized {
    fn into_api_result(self) -> IntoApiResult<Self, T, E>;
}

impl<F, T, E> ApiResultFutureExt<T, E> for F
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    fn into_api_result(self) -> IntoApiResult<Self, T, E> {
        self.map(ApiResult::from_result as fn(Result<T, E>) -> ApiResult<T>)
    }
}

/// Wrap any value as a successful [`ApiResult`].
pub trait SuccessExt: Sized {
    fn into_success(self) -> ApiResult<Self> {
        ApiResult::success(self)
    }
}

impl<T> SuccessExt for T {}
