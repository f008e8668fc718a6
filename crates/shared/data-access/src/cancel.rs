//! Cooperative cancellation for store calls.

use std::future::Future;

use sea_orm::DbErr;
use tokio_util::sync::CancellationToken;

use crate::error::{DataError, DataResult};

/// Fail fast when the token has already fired.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> DataResult<()> {
    if cancel.is_cancelled() {
        return Err(DataError::Cancelled);
    }
    Ok(())
}

/// Race a store future against the token.
///
/// The token is polled first so an already-cancelled call never reaches
/// the database.
pub(crate) async fn run_cancellable<T, F>(cancel: &CancellationToken, fut: F) -> DataResult<T>
where
    F: Future<Output = Result<T, DbErr>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DataError::Cancelled),
        result = fut => result.map_err(DataError::from),
    }
}
