//! SeaORM entity definitions

pub mod product;

pub use product::{Entity as ProductEntity, Model as Product};
