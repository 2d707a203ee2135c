//! Newsletter subscriber repository.
//!
//! Replaces the in-memory subscriber set of earlier iterations with a
//! table keyed by the normalized email, so subscriptions survive restarts
//! and are shared across instances.

use sqlx::PgPool;

use save_point_core::Email;

use super::RepositoryError;

/// Repository for newsletter subscriptions.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an email address.
    ///
    /// Returns `true` if the address was newly added, `false` if it was
    /// already subscribed (not an error).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn subscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO newsletter_subscriber (email)
             VALUES ($1)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
