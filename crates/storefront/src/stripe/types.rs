//! Wire types for the Stripe API.
//!
//! Only the fields the checkout pipeline consumes are modeled. Everything
//! optional on Stripe's side is `Option` here so that partially-populated
//! sessions (embedded checkout mid-collection) deserialize cleanly.

use std::collections::HashMap;

use serde::Deserialize;

use save_point_core::PaymentStatus;

/// Event type for a completed checkout session.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
/// Event type for an expired checkout session.
pub const CHECKOUT_SESSION_EXPIRED: &str = "checkout.session.expired";

/// A checkout session, possibly expanded with line items.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Present on freshly created embedded-mode sessions.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Total in minor currency units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
    /// Only present when the session was retrieved with expansion.
    #[serde(default)]
    pub line_items: Option<LineItemList>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Customer contact details collected during checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Shipping details collected during checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// A postal address.
#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Paginated line item list from session expansion.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemList {
    #[serde(default)]
    pub data: Vec<LineItem>,
}

/// A line item on a paid session.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<PriceInfo>,
}

/// Price information attached to a line item.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceInfo {
    /// Unit amount in minor currency units.
    #[serde(default)]
    pub unit_amount: Option<i64>,
    /// Product identifier (string id, not expanded).
    #[serde(default)]
    pub product: Option<String>,
    /// Carries `product_id` and `sync_variant_id` set at session creation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// The object an event describes.
///
/// Kept as raw JSON in the envelope; [`Event::checkout_session`] parses it
/// into a typed session for the session event family.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl Event {
    /// Parse the event object as a checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not have the session shape.
    pub fn checkout_session(&self) -> Result<CheckoutSession, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_checkout_session_parses() {
        let json = serde_json::json!({
            "id": "evt_1",
            "type": CHECKOUT_SESSION_COMPLETED,
            "data": {"object": {
                "id": "cs_test_123",
                "amount_total": 2499,
                "currency": "usd",
                "payment_status": "paid"
            }}
        });
        let event: Event = serde_json::from_value(json).unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);

        let session = event.checkout_session().unwrap();
        assert_eq!(session.id, "cs_test_123");
        assert_eq!(session.amount_total, Some(2499));
        assert_eq!(session.payment_status, PaymentStatus::Paid);
        assert!(session.customer_details.is_none());
    }

    #[test]
    fn test_partial_session_deserializes() {
        // Embedded checkout mid-collection: no email, no shipping yet
        let json = serde_json::json!({
            "id": "cs_test_456",
            "payment_status": "unpaid",
            "customer_details": {"email": null, "name": null}
        });
        let session: CheckoutSession = serde_json::from_value(json).unwrap();
        assert!(session.customer_details.unwrap().email.is_none());
        assert!(session.shipping_details.is_none());
        assert!(session.line_items.is_none());
    }
}
