//! Printful API client implementation.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use save_point_core::ProductId;

use super::PrintfulError;
use super::catalog::{CatalogProduct, normalize_product};
use super::types::{
    ApiEnvelope, CreatedOrder, NewFulfillmentOrder, SyncProductDetail, SyncProductSummary,
};

/// Printful API base URL.
const BASE_URL: &str = "https://api.printful.com";

/// Upper bound on any single upstream call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Printful API.
///
/// Provides the normalized catalog (sync products) and fulfillment order
/// creation. Stateless; cheap to clone.
#[derive(Clone)]
pub struct PrintfulClient {
    client: reqwest::Client,
    base_url: String,
    store_id: Option<String>,
}

impl PrintfulClient {
    /// Create a new Printful API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build (e.g., the token
    /// contains characters that are invalid in a header).
    pub fn new(config: &crate::config::PrintfulConfig) -> Result<Self, PrintfulError> {
        Self::with_base_url(config, BASE_URL)
    }

    pub(crate) fn with_base_url(
        config: &crate::config::PrintfulConfig,
        base_url: &str,
    ) -> Result<Self, PrintfulError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PrintfulError::Parse(format!("invalid API token format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store_id: config.store_id.clone(),
        })
    }

    /// Build a full URL, appending the store id parameter when configured.
    fn url(&self, path: &str) -> String {
        match &self.store_id {
            Some(store_id) => format!("{}{path}?store_id={store_id}", self.base_url),
            None => format!("{}{path}", self.base_url),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PrintfulError> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::parse_response(path, response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PrintfulError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::parse_response(path, response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, PrintfulError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(PrintfulError::NotFound(path.to_string()));
        }

        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                status = %status,
                path = %path,
                body = %body.chars().take(500).collect::<String>(),
                "Printful API returned non-success status"
            );
            return Err(PrintfulError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                path = %path,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse Printful response"
            );
            PrintfulError::Parse(e.to_string())
        })?;

        Ok(envelope.result)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the full normalized catalog.
    ///
    /// One full fetch per call: the summary list plus each product's detail
    /// (the list endpoint carries no variants, and checkout reconciliation
    /// needs variant prices). Products that cannot be normalized are
    /// filtered out, not surfaced as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the product list itself cannot be fetched;
    /// callers fall back to the placeholder catalog.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<CatalogProduct>, PrintfulError> {
        let summaries: Vec<SyncProductSummary> = self.get("/sync/products").await?;
        debug!(count = summaries.len(), "fetched sync product list");

        let mut products = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            if summary.is_ignored {
                continue;
            }
            match self.fetch_detail(summary.id).await {
                Ok(detail) => {
                    if let Some(product) = normalize_product(&detail) {
                        products.push(product);
                    }
                }
                Err(e) => {
                    // One broken product must not take down the whole catalog
                    warn!(product_id = summary.id, error = %e, "skipping product that failed to load");
                }
            }
        }

        Ok(products)
    }

    /// Fetch a single normalized product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist or cannot be
    /// presented (no synced variants, no usable price).
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<CatalogProduct, PrintfulError> {
        let detail = self.fetch_detail(id.as_i64()).await?;

        normalize_product(&detail)
            .ok_or_else(|| PrintfulError::NotFound(format!("sync product {id}")))
    }

    async fn fetch_detail(&self, id: i64) -> Result<SyncProductDetail, PrintfulError> {
        self.get(&format!("/sync/products/{id}")).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create a fulfillment order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails; the caller decides whether
    /// to retry (see the fulfillment service).
    #[instrument(skip(self, order), fields(external_id = %order.external_id))]
    pub async fn create_order(
        &self,
        order: &NewFulfillmentOrder,
    ) -> Result<CreatedOrder, PrintfulError> {
        self.post("/orders", order).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PrintfulConfig;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(store_id: Option<&str>) -> PrintfulConfig {
        PrintfulConfig {
            api_token: SecretString::from("pf_token_for_tests"),
            store_id: store_id.map(String::from),
        }
    }

    fn client(server: &MockServer, store_id: Option<&str>) -> PrintfulClient {
        PrintfulClient::with_base_url(&config(store_id), &server.uri()).unwrap()
    }

    fn product_detail(id: i64, name: &str, price: &str) -> serde_json::Value {
        json!({
            "sync_product": {"id": id, "name": name, "synced": 1},
            "sync_variants": [
                {"id": id * 10, "name": "Default", "synced": true, "retail_price": price, "sku": "SKU"}
            ]
        })
    }

    #[tokio::test]
    async fn test_list_products_normalizes_and_filters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sync/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "result": [
                    {"id": 1, "name": "Retro Tee", "synced": 1},
                    {"id": 2, "name": "Unsynced Cap", "synced": 0}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sync/products/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "result": product_detail(1, "Retro Tee", "24.99")
            })))
            .mount(&server)
            .await;
        // Product 2 has no synced variants and gets filtered, not errored
        Mock::given(method("GET"))
            .and(path("/sync/products/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "result": {"sync_product": {"id": 2, "name": "Unsynced Cap"}, "sync_variants": []}
            })))
            .mount(&server)
            .await;

        let products = client(&server, None).list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Retro Tee");
        assert_eq!(products[0].price.to_minor_units(), 2499);
    }

    #[tokio::test]
    async fn test_store_id_is_sent_as_query_param() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sync/products"))
            .and(query_param("store_id", "9981"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 200, "result": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let products = client(&server, Some("9981")).list_products().await.unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sync/products"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server, None).list_products().await.unwrap_err();
        assert!(matches!(err, PrintfulError::Api { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_get_product_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sync/products/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_product(ProductId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, PrintfulError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_order_posts_payload() {
        use crate::printful::types::{FulfillmentItem, Recipient, RetailCosts};

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "result": {"id": 5551212, "status": "draft"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = NewFulfillmentOrder {
            external_id: "cs_test_123".to_string(),
            shipping: "STANDARD".to_string(),
            recipient: Recipient {
                name: "Player One".to_string(),
                address1: "1 Arcade Way".to_string(),
                address2: None,
                city: "Austin".to_string(),
                state_code: "TX".to_string(),
                state_name: "TX".to_string(),
                country_code: "US".to_string(),
                country_name: "US".to_string(),
                zip: "78701".to_string(),
                phone: None,
                email: "p1@example.com".to_string(),
            },
            items: vec![FulfillmentItem {
                sync_variant_id: 10,
                quantity: 1,
                price: "24.99".to_string(),
                retail_price: "24.99".to_string(),
            }],
            retail_costs: RetailCosts {
                currency: "USD".to_string(),
                subtotal: "24.99".to_string(),
                discount: "0.00".to_string(),
                shipping: "0.00".to_string(),
                tax: "0.00".to_string(),
                vat: "0.00".to_string(),
                total: "24.99".to_string(),
            },
        };

        let created = client(&server, None).create_order(&order).await.unwrap();
        assert_eq!(created.id, 5_551_212);
        assert_eq!(created.status, "draft");
    }
}
