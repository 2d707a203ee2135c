//! Product catalog route handlers.
//!
//! The catalog is fetched from the fulfillment provider per request. When
//! the provider is unconfigured or unreachable the handlers degrade to the
//! static placeholder catalog instead of surfacing an error to the
//! shopper.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use save_point_core::ProductId;

use crate::error::{AppError, Result};
use crate::printful::{CatalogProduct, PrintfulError, fallback_catalog};
use crate::state::AppState;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

const fn default_page() -> usize {
    1
}

const fn default_limit() -> usize {
    12
}

/// Product listing response.
#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<CatalogProduct>,
    pub pagination: Pagination,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Single product response.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: CatalogProduct,
}

/// List catalog products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductList>> {
    let catalog = match state.printful() {
        Some(client) => match client.list_products().await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "catalog fetch failed, serving placeholder catalog");
                fallback_catalog()
            }
        },
        None => fallback_catalog(),
    };

    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let total = catalog.len();

    let products: Vec<CatalogProduct> = catalog
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();

    Ok(Json(ProductList {
        products,
        pagination: Pagination {
            current_page: page,
            total,
            per_page: limit,
            total_pages: total.div_ceil(limit),
        },
    }))
}

/// Show a single catalog product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductDetail>> {
    let id = ProductId::new(id);

    let product = match state.printful() {
        Some(client) => match client.get_product(id).await {
            Ok(product) => product,
            Err(PrintfulError::NotFound(_)) => {
                return Err(AppError::NotFound(format!("product {id}")));
            }
            Err(e) => {
                warn!(error = %e, "product fetch failed, checking placeholder catalog");
                placeholder_product(id)?
            }
        },
        None => placeholder_product(id)?,
    };

    Ok(Json(ProductDetail { product }))
}

fn placeholder_product(id: ProductId) -> Result<CatalogProduct> {
    fallback_catalog()
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}
