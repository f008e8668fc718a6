//! Product service - Catalogue use cases.
//!
//! Each operation opens its own [`DbContext`], reads or stages through a
//! [`Repository`], and commits with `save_changes`. Outcomes are returned as
//! [`ApiResult`] values so handlers never see raw errors.

use api_result::{ApiResult, ApiResultFutureExt};
use async_trait::async_trait;
use chrono::Utc;
use data_access::{DbContext, Repository, UnitOfWork};
use sea_orm::{ColumnTrait, DatabaseConnection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{respond, AppError, AppResult, OptionExt};
use crate::infra::entities::product;
use crate::infra::Product;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Fields of a product to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub in_stock: bool,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub in_stock: Option<bool>,
}

/// Stock partition of the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub in_stock: u64,
    pub out_of_stock: u64,
    pub total: u64,
}

/// Product service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductService: Send + Sync {
    /// List products, optionally only those with the given stock state
    async fn list_products(&self, in_stock: Option<bool>) -> ApiResult<Vec<Product>>;

    /// Count products in and out of stock
    async fn stock_summary(&self) -> ApiResult<StockSummary>;

    /// Get product by ID
    async fn get_product(&self, id: Uuid) -> ApiResult<Product>;

    async fn create_product(&self, input: NewProduct) -> ApiResult<Product>;

    /// Apply a partial update through a tracked read
    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> ApiResult<Product>;

    /// Remove a product; 404 when it does not exist
    async fn delete_product(&self, id: Uuid) -> ApiResult<()>;
}

/// Concrete implementation of ProductService over SeaORM.
pub struct ProductCatalog {
    db: DatabaseConnection,
}

impl ProductCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fresh unit of work for one operation.
    fn context(&self) -> DbContext {
        DbContext::new(self.db.clone())
    }

    async fn list(&self, in_stock: Option<bool>) -> AppResult<Vec<Product>> {
        let ctx = self.context();
        let products = Repository::<product::Entity>::new(&ctx);

        let query = match in_stock {
            Some(flag) => products.filter(product::Column::InStock.eq(flag)),
            None => products.get_all(),
        };
        Ok(query.all().await?)
    }

    async fn summary(&self) -> AppResult<StockSummary> {
        let ctx = self.context();
        let counts = Repository::<product::Entity>::new(&ctx)
            .count_by(product::Column::InStock.eq(true))
            .fetch()
            .await?;

        let in_stock = counts.get(&true).copied().unwrap_or(0);
        let out_of_stock = counts.get(&false).copied().unwrap_or(0);
        Ok(StockSummary {
            in_stock,
            out_of_stock,
            total: in_stock + out_of_stock,
        })
    }

    async fn find(&self, id: Uuid) -> AppResult<Product> {
        let ctx = self.context();
        Repository::<product::Entity>::new(&ctx)
            .get_by_id(id)
            .await?
            .ok_or_not_found()
    }

    async fn apply_changes(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product> {
        let ctx = self.context();
        let products = Repository::<product::Entity>::new(&ctx);

        let tracked = products
            .first_or_default_tracked(product::Column::Id.eq(id))
            .await?
            .ok_or_not_found()?;

        tracked.modify(|p| {
            if let Some(name) = changes.name {
                p.name = name;
            }
            if let Some(price_cents) = changes.price_cents {
                p.price_cents = price_cents;
            }
            if let Some(in_stock) = changes.in_stock {
                p.in_stock = in_stock;
            }
            p.updated_at = Utc::now();
        });

        ctx.save_changes().await?;
        tracing::info!(product_id = %id, "Product updated");
        Ok(tracked.get())
    }

    async fn remove(&self, id: Uuid) -> AppResult<()> {
        let ctx = self.context();
        Repository::<product::Entity>::new(&ctx)
            .delete_by_id(id)
            .await?;

        ctx.save_changes().await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

#[async_trait]
impl ProductService for ProductCatalog {
    async fn list_products(&self, in_stock: Option<bool>) -> ApiResult<Vec<Product>> {
        respond(self.list(in_stock).await)
    }

    async fn stock_summary(&self) -> ApiResult<StockSummary> {
        respond(self.summary().await)
    }

    async fn get_product(&self, id: Uuid) -> ApiResult<Product> {
        respond(self.find(id).await)
    }

    async fn create_product(&self, input: NewProduct) -> ApiResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            price_cents: input.price_cents,
            in_stock: input.in_stock,
            created_at: now,
            updated_at: now,
        };

        let ctx = self.context();
        Repository::<product::Entity>::new(&ctx).add(product.clone());

        async {
            ctx.save_changes()
                .await
                .map(|_| product)
                .map_err(|e| AppError::from(e).user_messages().join(", "))
        }
        .into_api_result()
        .await
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> ApiResult<Product> {
        respond(self.apply_changes(id, changes).await)
    }

    async fn delete_product(&self, id: Uuid) -> ApiResult<()> {
        respond(self.remove(id).await)
    }
}
