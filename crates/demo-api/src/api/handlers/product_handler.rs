//! Product handlers.
//!
//! Every handler returns the service's `ApiResult` as is; its `statusCode`
//! becomes the HTTP status.

use api_result::ApiResult;
use axum::{
    extract::State,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ApiPath, ApiQuery, ValidatedJson};
use crate::api::AppState;
use crate::infra::Product;
use crate::services::{NewProduct, ProductChanges, StockSummary};

/// Product creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1 to 120 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price_cents: i64,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

/// Partial product update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1 to 120 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price_cents: Option<i64>,
    pub in_stock: Option<bool>,
}

/// Query string of the list endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub in_stock: Option<bool>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            name: req.name,
            price_cents: req.price_cents,
            in_stock: req.in_stock,
        }
    }
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            price_cents: req.price_cents,
            in_stock: req.in_stock,
        }
    }
}

/// Create product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/summary", get(stock_summary))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Vec<Product>> {
    state.product_service.list_products(params.in_stock).await
}

pub async fn stock_summary(State(state): State<AppState>) -> ApiResult<StockSummary> {
    state.product_service.stock_summary().await
}

pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Product> {
    state.product_service.get_product(id).await
}

pub async fn create_product(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> ApiResult<Product> {
    state.product_service.create_product(payload.into()).await
}

pub async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> ApiResult<Product> {
    state
        .product_service
        .update_product(id, payload.into())
        .await
}

pub async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    state.product_service.delete_product(id).await
}
