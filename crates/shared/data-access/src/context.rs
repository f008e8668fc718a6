//! Persistence context and Unit of Work contract.
//!
//! A context pairs a database handle with a [`ChangeTracker`]. Repositories
//! borrow it to stage writes; [`UnitOfWork::save_changes`] sends everything
//! staged to the database as one transaction.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::error::DataResult;
use crate::tracker::ChangeTracker;

/// Commit contract implemented by persistence contexts.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Persist every staged change, returning the number of affected rows.
    async fn save_changes(&self) -> DataResult<u64> {
        self.save_changes_cancellable(&CancellationToken::new()).await
    }

    /// Same as [`UnitOfWork::save_changes`], aborting when `cancel` fires.
    ///
    /// Nothing is persisted when the commit is cancelled or fails; the
    /// staged changes remain for another attempt.
    async fn save_changes_cancellable(&self, cancel: &CancellationToken) -> DataResult<u64>;
}

/// What a repository needs from the context it is bound to.
pub trait PersistenceContext: UnitOfWork {
    /// Connection used for reads.
    fn connection(&self) -> &DatabaseConnection;

    /// Tracker receiving staged writes and tracked entities.
    fn tracker(&self) -> &ChangeTracker;
}

/// SeaORM-backed persistence context.
///
/// Create one per logical unit of work (typically per request). The
/// connection handle is a cheap clone of the application's pool.
pub struct DbContext {
    db: DatabaseConnection,
    tracker: ChangeTracker,
}

impl DbContext {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            tracker: ChangeTracker::new(),
        }
    }
}

#[async_trait]
impl UnitOfWork for DbContext {
    async fn save_changes_cancellable(&self, cancel: &CancellationToken) -> DataResult<u64> {
        self.tracker.commit(&self.db, cancel).await
    }
}

impl PersistenceContext for DbContext {
    fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }
}
