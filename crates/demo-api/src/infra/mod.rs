//! Infrastructure layer - Database connection, schema and entities.

pub mod db;
pub mod entities;

pub use db::{Database, Migrator};
pub use entities::{Product, ProductEntity};
