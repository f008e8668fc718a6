//! Application services layer - Use cases and business logic.
//!
//! Services depend on the generic repository and unit of work from
//! `data-access`, and report every outcome as an `ApiResult`.

mod product_service;

pub use product_service::{
    NewProduct, ProductCatalog, ProductChanges, ProductService, StockSummary,
};

#[cfg(any(test, feature = "test-utils"))]
pub use product_service::MockProductService;
