//! Application state shared by every handler.

use std::sync::Arc;

use crate::infra::Database;
use crate::services::{ProductCatalog, ProductService};

#[derive(Clone)]
pub struct AppState {
    /// Product service
    pub product_service: Arc<dyn ProductService>,
    /// Database connection
    pub database: Arc<Database>,
}

impl AppState {
    /// Wire the production services on top of a database.
    pub fn from_database(database: Arc<Database>) -> Self {
        let product_service = Arc::new(ProductCatalog::new(database.get_connection()));

        Self {
            product_service,
            database,
        }
    }

    /// Create application state with manually injected services.
    pub fn new(product_service: Arc<dyn ProductService>, database: Arc<Database>) -> Self {
        Self {
            product_service,
            database,
        }
    }
}
