//! Stripe API client implementation.
//!
//! Stripe's REST API takes form-encoded bodies with bracketed nesting
//! (`line_items[0][price_data][unit_amount]`); the form is assembled as a
//! flat list of key/value pairs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{instrument, warn};

use save_point_core::VariantId;

use super::StripeError;
use super::types::CheckoutSession;
use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com";

/// Upper bound on any single upstream call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Countries shipping can be collected for.
const ALLOWED_SHIPPING_COUNTRIES: &[&str] = &["US", "CA", "GB", "AU"];

/// A line item for session creation, already price-reconciled.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub name: String,
    /// Unit amount in minor currency units (cents).
    pub unit_amount: i64,
    pub quantity: i64,
    pub image: Option<String>,
    /// Catalog product id, carried through session metadata.
    pub product_id: String,
    /// Fulfillment variant id, carried through session metadata.
    pub sync_variant_id: Option<VariantId>,
}

/// Parameters for creating an embedded checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub line_items: Vec<SessionLineItem>,
    pub customer_email: Option<String>,
    /// Return target; may contain the `{CHECKOUT_SESSION_ID}` placeholder.
    pub success_url: String,
    /// Embedded sessions have no cancel redirect; kept for hosted mode.
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

/// Client for the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe API client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self::with_base_url(config, BASE_URL)
    }

    pub(crate) fn with_base_url(config: &StripeConfig, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// Create an embedded-mode checkout session.
    ///
    /// Nothing is persisted on the Stripe side unless this call succeeds,
    /// so a failure leaves no partial state behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the session-creation call fails; callers surface
    /// it as a generic checkout failure.
    #[instrument(skip(self, params), fields(item_count = params.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, StripeError> {
        let form = build_session_form(params);

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve a checkout session with line items, customer, and payment
    /// intent expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the retrieval call fails.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.base_url
            ))
            .bearer_auth(self.secret_key.expose_secret())
            .query(&[
                ("expand[]", "line_items"),
                ("expand[]", "customer"),
                ("expand[]", "payment_intent"),
            ])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<CheckoutSession, StripeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = parse_error_message(&body)
                .unwrap_or_else(|| body.chars().take(200).collect());
            warn!(status = %status, message = %message, "Stripe API returned error");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse Stripe response"
            );
            StripeError::Parse(e.to_string())
        })
    }
}

/// Pull the human-readable message out of a Stripe error body.
fn parse_error_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorEnvelope {
        error: ErrorBody,
    }
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
}

/// Assemble the form-encoded parameter list for session creation.
fn build_session_form(params: &CheckoutSessionParams) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("ui_mode".into(), "embedded".into()),
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("return_url".into(), params.success_url.clone()),
        ("automatic_tax[enabled]".into(), "true".into()),
        // Phone number is required for fulfillment shipping
        ("phone_number_collection[enabled]".into(), "true".into()),
    ];

    for (i, country) in ALLOWED_SHIPPING_COUNTRIES.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            (*country).to_string(),
        ));
    }

    for (i, item) in params.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        form.push((format!("{prefix}[price_data][currency]"), "usd".into()));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(image) = &item.image {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((
            format!("{prefix}[price_data][product_data][metadata][product_id]"),
            item.product_id.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][metadata][sync_variant_id]"),
            item.sync_variant_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ));
    }

    // Free standard shipping, 5-7 business days
    form.extend(shipping_option(0, 0, "Free shipping", 5, 7));
    // Express shipping at $9.99, 2-3 business days
    form.extend(shipping_option(1, 999, "Express shipping", 2, 3));

    if let Some(email) = &params.customer_email {
        form.push(("customer_email".into(), email.clone()));
    }

    for (key, value) in &params.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form.push(("metadata[order_source]".into(), "website".into()));

    form
}

/// Build one fixed-amount shipping option.
fn shipping_option(
    index: usize,
    amount: i64,
    display_name: &str,
    min_days: u8,
    max_days: u8,
) -> Vec<(String, String)> {
    let prefix = format!("shipping_options[{index}][shipping_rate_data]");
    vec![
        (format!("{prefix}[type]"), "fixed_amount".into()),
        (format!("{prefix}[fixed_amount][amount]"), amount.to_string()),
        (format!("{prefix}[fixed_amount][currency]"), "usd".into()),
        (format!("{prefix}[display_name]"), display_name.into()),
        (
            format!("{prefix}[delivery_estimate][minimum][unit]"),
            "business_day".into(),
        ),
        (
            format!("{prefix}[delivery_estimate][minimum][value]"),
            min_days.to_string(),
        ),
        (
            format!("{prefix}[delivery_estimate][maximum][unit]"),
            "business_day".into(),
        ),
        (
            format!("{prefix}[delivery_estimate][maximum][value]"),
            max_days.to_string(),
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> StripeConfig {
        StripeConfig {
            secret_key: SecretString::from("sk_test_key_for_tests"),
            webhook_secret: SecretString::from("whsec_test"),
        }
    }

    fn params() -> CheckoutSessionParams {
        CheckoutSessionParams {
            line_items: vec![SessionLineItem {
                name: "Retro Gaming Hoodie".to_string(),
                unit_amount: 2499,
                quantity: 1,
                image: Some("https://img.example.com/hoodie.png".to_string()),
                product_id: "371".to_string(),
                sync_variant_id: Some(VariantId::new(1002)),
            }],
            customer_email: Some("p1@example.com".to_string()),
            success_url: "https://shop.example.com/checkout/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://shop.example.com/checkout/cancel".to_string(),
            metadata: vec![("item_count".to_string(), "1".to_string())],
        }
    }

    fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_converts_price_to_minor_units() {
        let form = build_session_form(&params());
        assert_eq!(
            form_value(&form, "line_items[0][price_data][unit_amount]"),
            Some("2499")
        );
        assert_eq!(
            form_value(&form, "line_items[0][price_data][currency]"),
            Some("usd")
        );
        assert_eq!(form_value(&form, "line_items[0][quantity]"), Some("1"));
    }

    #[test]
    fn test_form_embedded_mode_and_collection_settings() {
        let form = build_session_form(&params());
        assert_eq!(form_value(&form, "ui_mode"), Some("embedded"));
        assert_eq!(form_value(&form, "mode"), Some("payment"));
        assert_eq!(
            form_value(&form, "phone_number_collection[enabled]"),
            Some("true")
        );
        assert_eq!(form_value(&form, "automatic_tax[enabled]"), Some("true"));
        assert_eq!(
            form_value(&form, "shipping_address_collection[allowed_countries][0]"),
            Some("US")
        );
    }

    #[test]
    fn test_form_shipping_options() {
        let form = build_session_form(&params());
        assert_eq!(
            form_value(
                &form,
                "shipping_options[0][shipping_rate_data][fixed_amount][amount]"
            ),
            Some("0")
        );
        assert_eq!(
            form_value(
                &form,
                "shipping_options[1][shipping_rate_data][fixed_amount][amount]"
            ),
            Some("999")
        );
        assert_eq!(
            form_value(
                &form,
                "shipping_options[0][shipping_rate_data][delivery_estimate][maximum][value]"
            ),
            Some("7")
        );
    }

    #[test]
    fn test_form_metadata_carries_variant_id_and_source() {
        let form = build_session_form(&params());
        assert_eq!(
            form_value(
                &form,
                "line_items[0][price_data][product_data][metadata][sync_variant_id]"
            ),
            Some("1002")
        );
        assert_eq!(form_value(&form, "metadata[order_source]"), Some("website"));
        assert_eq!(form_value(&form, "metadata[item_count]"), Some("1"));
    }

    #[tokio::test]
    async fn test_create_checkout_session_returns_client_secret() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(body_string_contains("ui_mode=embedded"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_789",
                "client_secret": "cs_test_789_secret_abc",
                "payment_status": "unpaid"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = StripeClient::with_base_url(&config(), &server.uri());
        let session = client.create_checkout_session(&params()).await.unwrap();
        assert_eq!(session.id, "cs_test_789");
        assert_eq!(
            session.client_secret.as_deref(),
            Some("cs_test_789_secret_abc")
        );
    }

    #[tokio::test]
    async fn test_create_checkout_session_error_message_extracted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Missing required param: line_items.", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let client = StripeClient::with_base_url(&config(), &server.uri());
        let err = client.create_checkout_session(&params()).await.unwrap_err();
        match err {
            StripeError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Missing required param: line_items.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retrieve_expands_line_items() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_789"))
            .and(query_param("expand[]", "line_items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_789",
                "amount_total": 2499,
                "currency": "usd",
                "payment_status": "paid",
                "line_items": {"data": [
                    {"description": "Retro Gaming Hoodie", "quantity": 1,
                     "price": {"unit_amount": 2499, "product": "prod_1",
                               "metadata": {"sync_variant_id": "1002", "product_id": "371"}}}
                ]}
            })))
            .mount(&server)
            .await;

        let client = StripeClient::with_base_url(&config(), &server.uri());
        let session = client
            .retrieve_checkout_session("cs_test_789")
            .await
            .unwrap();
        let items = session.line_items.unwrap();
        assert_eq!(items.data.len(), 1);
        let price = items.data[0].price.as_ref().unwrap();
        assert_eq!(price.unit_amount, Some(2499));
        assert_eq!(price.metadata.get("sync_variant_id").unwrap(), "1002");
    }
}
