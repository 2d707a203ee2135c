//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness check (in main)
//! GET  /health/ready              - Readiness check (in main)
//!
//! # Checkout pipeline
//! POST /checkout                  - Validated cart -> embedded checkout client secret
//! POST /webhooks/payment          - Signature-verified payment events
//!
//! # Catalog
//! GET  /api/products              - Product listing (placeholder catalog on degraded mode)
//! GET  /api/products/{id}         - Product detail
//!
//! # Orders
//! GET  /api/orders/{session_id}   - Persisted order for the success page
//!
//! # Newsletter
//! POST /api/newsletter            - Newsletter capture
//! ```

pub mod checkout;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::rate_limit;
use crate::state::AppState;

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let rate_limited = Router::new()
        .route("/checkout", post(checkout::create))
        .route_layer(rate_limit::checkout_rate_limiter())
        .merge(
            Router::new()
                .route("/api/newsletter", post(newsletter::subscribe))
                .route_layer(rate_limit::newsletter_rate_limiter()),
        );

    Router::new()
        .route("/webhooks/payment", post(webhooks::receive))
        .route("/api/products", get(products::index))
        .route("/api/products/{id}", get(products::show))
        .route("/api/orders/{session_id}", get(orders::show))
        .merge(rate_limited)
}
