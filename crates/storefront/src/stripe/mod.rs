//! Stripe REST API client and webhook verification.
//!
//! # Architecture
//!
//! - Checkout sessions are created in embedded mode over the form-encoded
//!   REST API with `reqwest`; no SDK crate
//! - Webhook payloads are authenticated with the `Stripe-Signature`
//!   HMAC-SHA256 scheme before anything in them is trusted
//! - Wire types live in [`types`]; only the fields this crate consumes
//!   are modeled
//!
//! # Example
//!
//! ```rust,ignore
//! use save_point_storefront::stripe::StripeClient;
//!
//! let client = StripeClient::new(&config.stripe);
//! let session = client.create_checkout_session(&params).await?;
//! // session.client_secret drives the embedded payment UI
//! ```

mod client;
pub mod types;
pub mod webhook;

pub use client::{CheckoutSessionParams, SessionLineItem, StripeClient};

use thiserror::Error;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed (connect error, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_error_display() {
        let err = StripeError::Api {
            status: 402,
            message: "Your card was declined.".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 402 - Your card was declined.");
    }
}
