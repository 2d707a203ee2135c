//! Database operations for storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `orders` - One row per paid checkout session. The UNIQUE index on
//!   `stripe_session_id` is what makes webhook processing idempotent:
//!   at-least-once delivery may insert concurrently, the index guarantees
//!   a single row.
//! - `order_item` - Line items belonging to an order
//! - `shipping_address` - One address per order
//! - `newsletter_subscriber` - Captured newsletter emails
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p save-point-cli -- migrate
//! ```

pub mod newsletter;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
