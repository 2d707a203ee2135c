//! Wire types for the Printful API.
//!
//! Upstream payloads are modeled explicitly and validated at this boundary;
//! nothing dynamically-typed crosses into the rest of the crate. Fields the
//! storefront does not consume are simply not declared.

use serde::{Deserialize, Serialize};

/// Printful wraps every response in `{code, result}`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    pub result: T,
}

/// A sync product as returned by `GET /sync/products` (no variants).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Number of variants that are synced with the store.
    #[serde(default)]
    pub synced: i64,
    #[serde(default)]
    pub is_ignored: bool,
}

/// A sync product with its variants, from `GET /sync/products/{id}`.
#[derive(Debug, Deserialize)]
pub struct SyncProductDetail {
    pub sync_product: SyncProductSummary,
    #[serde(default)]
    pub sync_variants: Vec<SyncVariant>,
}

/// A sync variant nested in a product detail.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariant {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub synced: bool,
    /// Decimal price as a string, e.g. `"24.99"`. May be missing or junk.
    #[serde(default)]
    pub retail_price: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub files: Vec<VariantFile>,
    #[serde(default)]
    pub product: Option<VariantProduct>,
}

/// A print file attached to a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantFile {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// The catalog product a variant is based on.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantProduct {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub type_name: Option<String>,
}

// =============================================================================
// Order creation (fulfillment submission)
// =============================================================================

/// Order payload for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct NewFulfillmentOrder {
    /// Our idempotency handle on the Printful side: the payment session id.
    pub external_id: String,
    pub shipping: String,
    pub recipient: Recipient,
    pub items: Vec<FulfillmentItem>,
    pub retail_costs: RetailCosts,
}

/// Shipping recipient block.
#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub state_name: String,
    pub country_code: String,
    pub country_name: String,
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub email: String,
}

/// A line item keyed by the provider-recognized sync variant id.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentItem {
    pub sync_variant_id: i64,
    pub quantity: i64,
    pub price: String,
    pub retail_price: String,
}

/// Retail cost breakdown.
///
/// Shipping, tax, and vat are zero placeholders: Printful recalculates the
/// authoritative shipping cost and tax was already computed by the payment
/// processor.
#[derive(Debug, Clone, Serialize)]
pub struct RetailCosts {
    pub currency: String,
    pub subtotal: String,
    pub discount: String,
    pub shipping: String,
    pub tax: String,
    pub vat: String,
    pub total: String,
}

/// The order Printful created for us.
#[derive(Debug, Deserialize)]
pub struct CreatedOrder {
    pub id: i64,
    #[serde(default)]
    pub status: String,
}
