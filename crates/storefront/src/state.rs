//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::printful::{PrintfulClient, PrintfulError};
use crate::services::email::Notifier;
use crate::stripe::StripeClient;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build Printful client: {0}")]
    Printful(#[from] PrintfulError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and upstream clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    /// `None` when no Printful credentials are configured: the catalog
    /// serves placeholders and reconciliation is bypassed.
    printful: Option<PrintfulClient>,
    stripe: StripeClient,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured Printful client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let printful = config
            .printful
            .as_ref()
            .map(PrintfulClient::new)
            .transpose()?;
        let stripe = StripeClient::new(&config.stripe);
        let notifier = Notifier::from_config(config.email.as_ref());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                printful,
                stripe,
                notifier,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the Printful client, if credentials are configured.
    #[must_use]
    pub fn printful(&self) -> Option<&PrintfulClient> {
        self.inner.printful.as_ref()
    }

    /// Get a reference to the Stripe client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get a reference to the notification sender.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
