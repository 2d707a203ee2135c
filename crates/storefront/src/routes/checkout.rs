//! Checkout session creation.
//!
//! `POST /checkout` takes the client's cart, reconciles prices against the
//! catalog, and creates an embedded-mode payment session. The response
//! carries the client secret the front end feeds to the embedded payment
//! UI.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use save_point_core::Money;

use crate::error::{AppError, Result};
use crate::services::pricing::{self, CartLineItem};
use crate::state::AppState;
use crate::stripe::{CheckoutSessionParams, SessionLineItem};

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLineItem>,
    #[serde(default, rename = "customerInfo")]
    pub customer_info: Option<CustomerInfo>,
}

/// Optional customer contact hints.
#[derive(Debug, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Checkout response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub client_secret: String,
}

/// Create an embedded checkout session from a cart.
#[instrument(skip(state, request), fields(item_count = request.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if request.items.is_empty() {
        return Err(AppError::Validation(
            "No items provided for checkout".to_string(),
        ));
    }

    let reconciliation = pricing::reconcile(state.printful(), request.items).await;
    if !reconciliation.errors.is_empty() {
        return Err(AppError::Validation(reconciliation.errors.join("; ")));
    }

    // Reconciliation never invents items; re-check the invariants the
    // session manager relies on before calling out.
    for item in &reconciliation.validated {
        if item.price < Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Invalid price for \"{}\"",
                item.name
            )));
        }
        if item.name.trim().is_empty() {
            return Err(AppError::Validation("Item is missing a name".to_string()));
        }
    }

    let base_url = &state.config().base_url;
    let mut metadata = vec![
        ("source".to_string(), "website".to_string()),
        (
            "item_count".to_string(),
            reconciliation.validated.len().to_string(),
        ),
    ];
    if reconciliation.unmatched > 0 {
        // Flag orders carrying client-asserted prices for manual review
        metadata.push((
            "price_fallback_items".to_string(),
            reconciliation.unmatched.to_string(),
        ));
    }

    let params = CheckoutSessionParams {
        line_items: reconciliation
            .validated
            .iter()
            .map(|item| SessionLineItem {
                name: item.name.clone(),
                unit_amount: Money::usd(item.price).to_minor_units(),
                quantity: item.quantity,
                image: item.image.clone(),
                product_id: item.id.clone(),
                sync_variant_id: item.sync_variant_id,
            })
            .collect(),
        customer_email: request.customer_info.and_then(|c| c.email),
        success_url: format!("{base_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base_url}/checkout/cancel"),
        metadata,
    };

    let session = state.stripe().create_checkout_session(&params).await?;

    let client_secret = session.client_secret.ok_or_else(|| {
        AppError::Internal("checkout session created without client secret".to_string())
    })?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        client_secret,
    }))
}
