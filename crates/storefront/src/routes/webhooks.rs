//! Payment webhook ingestion.
//!
//! `POST /webhooks/payment` receives at-least-once, possibly duplicated,
//! possibly out-of-order event deliveries from the payment processor.
//! Processing order:
//!
//! 1. Verify the `Stripe-Signature` header - a mismatch is rejected with
//!    400 and nothing else happens.
//! 2. On `checkout.session.completed`, retrieve the expanded session. A
//!    session still missing the customer email or shipping address is not
//!    yet actionable: acknowledge and wait for the processor to redeliver
//!    once collection finishes (no polling, no retry loop here).
//! 3. Persist the order keyed by the session id. The UNIQUE index makes a
//!    second delivery a no-op.
//! 4. Fulfillment submission and the confirmation email run after the
//!    order row is durable; their failures are logged and isolated so a
//!    delivery is never redelivered forever over a non-recoverable
//!    downstream issue.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use save_point_core::{CurrencyCode, Email, Money};

use crate::db::orders::{NewOrder, NewOrderItem, NewShippingAddress, OrderRepository};
use crate::error::{AppError, Result};
use crate::services::email::{ConfirmationAddress, ConfirmationItem, OrderConfirmation};
use crate::services::fulfillment::{self, parse_variant_id};
use crate::state::AppState;
use crate::stripe::types::{
    CHECKOUT_SESSION_COMPLETED, CHECKOUT_SESSION_EXPIRED, CheckoutSession,
};
use crate::stripe::webhook::{self, ConstructEventError};

/// Receive a payment processor webhook delivery.
#[instrument(skip_all)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Authenticity("missing signature header".to_string()))?;

    let secret = state.config().stripe.webhook_secret.expose_secret();
    let event = webhook::construct_event(&body, signature, secret).map_err(|e| match e {
        ConstructEventError::Signature(e) => {
            warn!(error = %e, "webhook signature verification failed");
            AppError::Authenticity(e.to_string())
        }
        ConstructEventError::Payload(e) => {
            warn!(error = %e, "authentic webhook with malformed payload");
            AppError::Validation("malformed event payload".to_string())
        }
    })?;

    debug!(event_id = %event.id, event_type = %event.event_type, "webhook received");

    match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => {
            let session = event
                .checkout_session()
                .map_err(|_| AppError::Validation("event object is not a session".to_string()))?;
            info!(session_id = %session.id, "payment completed");
            handle_completed_session(&state, &session.id).await?;
        }
        CHECKOUT_SESSION_EXPIRED => {
            let session = event
                .checkout_session()
                .map_err(|_| AppError::Validation("event object is not a session".to_string()))?;
            info!(session_id = %session.id, "checkout session expired");
        }
        other => {
            debug!(event_type = %other, "ignoring unhandled event type");
        }
    }

    Ok(Json(json!({ "received": true })))
}

/// Process a completed checkout session end to end.
///
/// Errors returned from here become 5xx responses, which the processor
/// answers with redelivery - appropriate for transient failures around the
/// durable order-creation step, and only for those.
async fn handle_completed_session(state: &AppState, session_id: &str) -> Result<()> {
    // The event payload may predate detail collection; fetch the expanded
    // session as the authoritative snapshot.
    let session = state.stripe().retrieve_checkout_session(session_id).await?;

    let Some(new_order) = extract_order(&session)? else {
        // Not yet actionable - the processor will redeliver once the
        // missing details are collected.
        return Ok(());
    };

    let repository = OrderRepository::new(state.pool());
    let Some(order) = repository.create_if_absent(&new_order).await? else {
        info!(session_id = %session.id, "order already recorded for session, skipping");
        return Ok(());
    };

    info!(order_id = %order.id, session_id = %session.id, "order created");

    // Fulfillment: isolated, never unwinds the order
    if let Some(printful) = state.printful() {
        match fulfillment::submit(printful, &new_order).await {
            Ok(Some(printful_order_id)) => {
                if let Err(e) = repository
                    .set_printful_order_id(&new_order.stripe_session_id, &printful_order_id)
                    .await
                {
                    warn!(
                        session_id = %session.id,
                        printful_order_id = %printful_order_id,
                        error = %e,
                        "fulfillment submitted but order row not updated"
                    );
                }
            }
            Ok(None) => {
                warn!(
                    session_id = %session.id,
                    "order has no fulfillable items, left without fulfillment order id"
                );
            }
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    error = %e,
                    "fulfillment submission failed, order needs manual follow-up"
                );
            }
        }
    } else {
        warn!(
            session_id = %session.id,
            "no fulfillment credentials configured, order left unsubmitted"
        );
    }

    // Confirmation email: isolated, failure marker only
    let confirmation = build_confirmation(state, &new_order);
    let _sent = state.notifier().send_order_confirmation(&confirmation).await;

    Ok(())
}

/// Map an expanded session onto a new order.
///
/// Returns `Ok(None)` when the session is not yet actionable (customer
/// email or shipping address still missing).
fn extract_order(session: &CheckoutSession) -> Result<Option<NewOrder>> {
    let customer = session.customer_details.as_ref();

    let Some(email) = customer
        .and_then(|c| c.email.as_deref())
        .and_then(|e| Email::parse(e).ok())
    else {
        warn!(session_id = %session.id, "no customer email yet, waiting for redelivery");
        return Ok(None);
    };

    let Some(shipping) = session.shipping_details.as_ref() else {
        warn!(session_id = %session.id, "no shipping details yet, waiting for redelivery");
        return Ok(None);
    };
    let Some(address) = shipping.address.as_ref() else {
        warn!(session_id = %session.id, "no shipping address yet, waiting for redelivery");
        return Ok(None);
    };

    let line_items = session
        .line_items
        .as_ref()
        .filter(|l| !l.data.is_empty())
        .ok_or_else(|| {
            AppError::Internal(format!("no line items in expanded session {}", session.id))
        })?;

    let currency = CurrencyCode::parse_or_usd(session.currency.as_deref().unwrap_or("usd"));

    let items = line_items
        .data
        .iter()
        .map(|item| {
            let price = item.price.as_ref();
            NewOrderItem {
                product_id: price
                    .and_then(|p| p.metadata.get("product_id").cloned())
                    .or_else(|| price.and_then(|p| p.product.clone()))
                    .unwrap_or_default(),
                product_name: item.description.clone().unwrap_or_else(|| "Item".to_string()),
                sync_variant_id: parse_variant_id(
                    price.and_then(|p| p.metadata.get("sync_variant_id").map(String::as_str)),
                ),
                quantity: i32::try_from(item.quantity.unwrap_or(1)).unwrap_or(1),
                price: price
                    .and_then(|p| p.unit_amount)
                    .map_or(Decimal::ZERO, |minor| {
                        Money::from_minor_units(minor, currency).amount
                    }),
            }
        })
        .collect();

    let customer_name = customer
        .and_then(|c| c.name.clone())
        .or_else(|| shipping.name.clone())
        .unwrap_or_else(|| "Customer".to_string());
    let customer_phone = customer.and_then(|c| c.phone.clone());

    let total = session
        .amount_total
        .map_or(Money::new(Decimal::ZERO, currency), |minor| {
            Money::from_minor_units(minor, currency)
        });

    Ok(Some(NewOrder {
        stripe_session_id: session.id.clone(),
        customer_email: email,
        customer_name: customer_name.clone(),
        customer_phone: customer_phone.clone(),
        total,
        payment_status: session.payment_status,
        items,
        shipping_address: NewShippingAddress {
            name: shipping.name.clone().unwrap_or(customer_name),
            address1: address.line1.clone().unwrap_or_default(),
            address2: address.line2.clone(),
            city: address.city.clone().unwrap_or_default(),
            state_code: address.state.clone().unwrap_or_default(),
            country_code: address.country.clone().unwrap_or_default(),
            zip: address.postal_code.clone().unwrap_or_default(),
            phone: customer_phone,
        },
    }))
}

/// Assemble the confirmation email payload from the persisted order data.
fn build_confirmation(state: &AppState, order: &NewOrder) -> OrderConfirmation {
    let addr = &order.shipping_address;
    OrderConfirmation {
        customer_email: order.customer_email.as_str().to_string(),
        customer_name: order.customer_name.clone(),
        order_number: order.stripe_session_id.clone(),
        items: order
            .items
            .iter()
            .map(|item| ConfirmationItem {
                name: item.product_name.clone(),
                quantity: i64::from(item.quantity),
                price: format!("{:.2}", item.price),
            })
            .collect(),
        total: format!("{:.2}", order.total.amount),
        address: ConfirmationAddress {
            name: addr.name.clone(),
            address1: addr.address1.clone(),
            address2: addr.address2.clone(),
            city: addr.city.clone(),
            state_code: addr.state_code.clone(),
            zip: addr.zip.clone(),
            country_code: addr.country_code.clone(),
        },
        shop_url: format!("{}/shop", state.config().base_url),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use save_point_core::VariantId;

    fn full_session() -> CheckoutSession {
        serde_json::from_value(serde_json::json!({
            "id": "cs_test_123",
            "amount_total": 4998,
            "currency": "usd",
            "payment_status": "paid",
            "customer_details": {
                "email": "p1@example.com",
                "name": "Player One",
                "phone": "+15125550100"
            },
            "shipping_details": {
                "name": "Player One",
                "address": {
                    "line1": "1 Arcade Way",
                    "city": "Austin",
                    "state": "TX",
                    "postal_code": "78701",
                    "country": "US"
                }
            },
            "line_items": {"data": [
                {"description": "Retro Gaming Hoodie", "quantity": 2,
                 "price": {"unit_amount": 2499, "product": "prod_1",
                           "metadata": {"product_id": "371", "sync_variant_id": "1002"}}}
            ]}
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_full_session() {
        let order = extract_order(&full_session()).unwrap().unwrap();

        assert_eq!(order.stripe_session_id, "cs_test_123");
        assert_eq!(order.customer_email.as_str(), "p1@example.com");
        assert_eq!(order.total.amount, dec!(49.98));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, "371");
        assert_eq!(order.items[0].sync_variant_id, Some(VariantId::new(1002)));
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].price, dec!(24.99));
        assert_eq!(order.shipping_address.state_code, "TX");
        assert_eq!(order.shipping_address.phone.as_deref(), Some("+15125550100"));
    }

    #[test]
    fn test_missing_email_is_not_actionable() {
        let mut session = full_session();
        session.customer_details = None;
        assert!(extract_order(&session).unwrap().is_none());
    }

    #[test]
    fn test_missing_shipping_address_is_not_actionable() {
        let mut session = full_session();
        session.shipping_details.as_mut().unwrap().address = None;
        assert!(extract_order(&session).unwrap().is_none());

        session.shipping_details = None;
        assert!(extract_order(&session).unwrap().is_none());
    }

    #[test]
    fn test_missing_line_items_is_an_error() {
        let mut session = full_session();
        session.line_items = None;
        assert!(extract_order(&session).is_err());
    }

    #[test]
    fn test_item_without_variant_metadata_survives_extraction() {
        let mut session = full_session();
        session
            .line_items
            .as_mut()
            .unwrap()
            .data
            .iter_mut()
            .for_each(|item| {
                item.price.as_mut().unwrap().metadata.clear();
            });

        let order = extract_order(&session).unwrap().unwrap();
        // No variant id means it will be dropped at fulfillment, not here
        assert_eq!(order.items[0].sync_variant_id, None);
        // product falls back to the price's product reference
        assert_eq!(order.items[0].product_id, "prod_1");
    }
}
