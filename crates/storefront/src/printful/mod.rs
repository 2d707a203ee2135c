//! Printful REST API client.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest` with a bearer token; every response is
//!   wrapped in Printful's `{code, result}` envelope
//! - Printful is the source of truth for the catalog - products are
//!   refetched per request, no local sync
//! - Catalog normalization lives in [`catalog`]; the wire types in
//!   [`types`] never leave this module
//!
//! # Example
//!
//! ```rust,ignore
//! use save_point_storefront::printful::PrintfulClient;
//!
//! let client = PrintfulClient::new(&config)?;
//!
//! // Normalized catalog for the shop and price reconciliation
//! let products = client.list_products().await?;
//!
//! // Submit a fulfillment order after payment
//! let created = client.create_order(&order).await?;
//! ```

mod client;
pub mod catalog;
pub mod types;

pub use catalog::{CatalogProduct, CatalogVariant, fallback_catalog};
pub use client::PrintfulClient;

use thiserror::Error;

/// Errors that can occur when interacting with the Printful API.
#[derive(Debug, Error)]
pub enum PrintfulError {
    /// HTTP request failed (connect error, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl PrintfulError {
    /// Whether a retry has any chance of succeeding.
    ///
    /// Timeouts, connection failures, rate limits, and 5xx responses are
    /// transient; 4xx responses and parse failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::NotFound(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printful_error_display() {
        let err = PrintfulError::NotFound("sync product 371".to_string());
        assert_eq!(err.to_string(), "Not found: sync product 371");

        let err = PrintfulError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 502 - bad gateway");
    }

    #[test]
    fn test_is_transient() {
        assert!(
            PrintfulError::Api {
                status: 500,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            PrintfulError::Api {
                status: 429,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !PrintfulError::Api {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!PrintfulError::Parse("bad json".to_string()).is_transient());
        assert!(!PrintfulError::NotFound("gone".to_string()).is_transient());
    }
}
