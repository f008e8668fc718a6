//! Generic data access over SeaORM.
//!
//! This crate provides:
//! - [`Repository`]: CRUD and query helpers for any SeaORM entity
//! - [`UnitOfWork`]: the commit contract of a persistence context
//! - [`DbContext`]: a context with change tracking, so repository writes are
//!   staged and committed together
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = DbContext::new(db.clone());
//! let products = Repository::<product::Entity>::new(&ctx);
//!
//! products.add(new_product);
//! if let Some(stale) = products.first_or_default(product::Column::InStock.eq(false)).await? {
//!     products.delete(stale);
//! }
//!
//! // One transaction for both writes
//! ctx.save_changes().await?;
//! ```

mod cancel;
pub mod context;
pub mod error;
pub mod query;
pub mod repository;
pub mod tracker;

pub use context::{DbContext, PersistenceContext, UnitOfWork};
pub use error::{DataError, DataResult};
pub use query::{CountBy, Query, TrackedQuery};
pub use repository::{KeyOf, Repository};
pub use tracker::{ChangeTracker, Tracked};

pub use tokio_util::sync::CancellationToken;
