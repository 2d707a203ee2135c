//! Fulfillment submission for paid orders.
//!
//! Maps a persisted order onto the fulfillment provider's order shape and
//! submits it. Failures here never roll back the payment or the order
//! record: a paid order that could not be submitted keeps a `NULL`
//! fulfillment order id and is picked up manually.

use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use save_point_core::VariantId;

use crate::db::orders::NewOrder;
use crate::printful::types::{FulfillmentItem, NewFulfillmentOrder, Recipient, RetailCosts};
use crate::printful::{PrintfulClient, PrintfulError};

/// Submission attempts before giving up on a transient failure.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Submit an order for fulfillment.
///
/// Items without a valid sync variant id are dropped with a warning. When
/// every item is dropped, no call is made at all and `Ok(None)` is
/// returned - the order stays without a fulfillment order id rather than
/// being silently marked fulfilled.
///
/// Transient upstream failures are retried with jittered backoff.
///
/// # Errors
///
/// Returns the final error after retries are exhausted; the caller logs it
/// and leaves the order for manual follow-up.
pub async fn submit(
    printful: &PrintfulClient,
    order: &NewOrder,
) -> Result<Option<String>, PrintfulError> {
    let Some(fulfillment_order) = build_fulfillment_order(order) else {
        warn!(
            session_id = %order.stripe_session_id,
            "no fulfillable items in order, skipping submission"
        );
        return Ok(None);
    };

    let mut attempt = 1;
    loop {
        match printful.create_order(&fulfillment_order).await {
            Ok(created) => {
                info!(
                    session_id = %order.stripe_session_id,
                    printful_order_id = created.id,
                    status = %created.status,
                    "fulfillment order created"
                );
                return Ok(Some(created.id.to_string()));
            }
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let jitter: u64 = rand::rng().random_range(0..250);
                let delay = RETRY_BASE_DELAY * attempt + Duration::from_millis(jitter);
                warn!(
                    session_id = %order.stripe_session_id,
                    attempt,
                    error = %e,
                    "fulfillment submission failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Build the provider order payload, or `None` when no item carries a
/// usable sync variant id.
fn build_fulfillment_order(order: &NewOrder) -> Option<NewFulfillmentOrder> {
    let items: Vec<FulfillmentItem> = order
        .items
        .iter()
        .filter_map(|item| match item.sync_variant_id {
            Some(id) => Some(FulfillmentItem {
                sync_variant_id: id.as_i64(),
                quantity: i64::from(item.quantity),
                price: format!("{:.2}", item.price),
                retail_price: format!("{:.2}", item.price),
            }),
            None => {
                warn!(
                    product = %item.product_name,
                    "skipping item without sync variant id"
                );
                None
            }
        })
        .collect();

    if items.is_empty() {
        return None;
    }

    let addr = &order.shipping_address;
    let total = format!("{:.2}", order.total.amount);

    Some(NewFulfillmentOrder {
        external_id: order.stripe_session_id.clone(),
        shipping: "STANDARD".to_string(),
        recipient: Recipient {
            name: addr.name.clone(),
            address1: addr.address1.clone(),
            address2: addr.address2.clone(),
            city: addr.city.clone(),
            state_code: addr.state_code.clone(),
            // The session only carries codes; the provider accepts codes
            // in the name fields
            state_name: addr.state_code.clone(),
            country_code: addr.country_code.clone(),
            country_name: addr.country_code.clone(),
            zip: addr.zip.clone(),
            phone: addr.phone.clone(),
            email: order.customer_email.as_str().to_string(),
        },
        items,
        retail_costs: RetailCosts {
            currency: order.total.currency_code.code().to_string(),
            subtotal: total.clone(),
            discount: "0.00".to_string(),
            // Shipping is recalculated by the provider; tax was computed
            // by the payment processor
            shipping: "0.00".to_string(),
            tax: "0.00".to_string(),
            vat: "0.00".to_string(),
            total,
        },
    })
}

/// Convenience wrapper for `VariantId` from untrusted metadata strings.
#[must_use]
pub fn parse_variant_id(raw: Option<&str>) -> Option<VariantId> {
    raw?.parse().ok()
}
