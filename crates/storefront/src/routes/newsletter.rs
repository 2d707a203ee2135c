//! Newsletter subscription route handlers.
//!
//! Captures emails into the `newsletter_subscriber` table. Duplicate
//! subscriptions are reported as success - the address is already in the
//! system.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use save_point_core::Email;

use crate::db::NewsletterRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Newsletter subscription request body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Subscribe an email to the newsletter.
#[instrument(skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<Value>> {
    let email = Email::parse(&request.email)
        .map_err(|_| AppError::Validation("Please enter a valid email address".to_string()))?;

    let inserted = NewsletterRepository::new(state.pool())
        .subscribe(&email)
        .await?;

    if inserted {
        tracing::info!(email = %email, "newsletter subscription successful");
        Ok(Json(json!({
            "message": "Successfully subscribed to the newsletter!",
            "success": true
        })))
    } else {
        Ok(Json(json!({
            "message": "You are already subscribed!",
            "alreadySubscribed": true
        })))
    }
}
