//! Webhook signature verification.
//!
//! Stripe signs webhook deliveries with a shared-secret HMAC-SHA256 scheme.
//! The `Stripe-Signature` header carries a timestamp and one or more
//! signatures:
//!
//! ```text
//! t=1692262100,v1=5257a869e7...,v0=6ffbb59b2d...
//! ```
//!
//! The signed payload is `"{t}.{raw body}"`. Verification must pass before
//! any field of the payload is trusted; a stale timestamp is rejected to
//! bound replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use super::types::Event;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload, in seconds.
const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Reasons a signature header fails verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Header has no `t=` element or it is not an integer.
    #[error("missing or malformed timestamp in signature header")]
    MissingTimestamp,
    /// Header has no `v1=` element.
    #[error("no v1 signature in signature header")]
    MissingSignature,
    /// Timestamp is outside the accepted tolerance window.
    #[error("signature timestamp outside tolerance")]
    Expired,
    /// No candidate signature matched the payload.
    #[error("signature does not match payload")]
    Mismatch,
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing why verification failed. Callers
/// must reject the request with 400 and take no further action.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<(), SignatureError> {
    verify_signature_at(payload, header, secret, chrono::Utc::now().timestamp())
}

fn verify_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for element in header.split(',') {
        match element.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if candidates.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let mut matched = false;
    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            continue;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        // verify_slice is constant-time
        if mac.verify_slice(&expected).is_ok() {
            matched = true;
            break;
        }
    }

    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - timestamp).abs() > DEFAULT_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

/// Verify the signature and parse the event payload in one step.
///
/// # Errors
///
/// Returns [`ConstructEventError::Signature`] when authentication fails
/// (reject with 400, no retry benefit) and
/// [`ConstructEventError::Payload`] when an authentic payload is not a
/// well-formed event.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
) -> Result<Event, ConstructEventError> {
    verify_signature(payload, header, secret)?;
    let event = serde_json::from_slice(payload)?;
    Ok(event)
}

/// Errors from [`construct_event`].
#[derive(Debug, Error)]
pub enum ConstructEventError {
    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureError),
    #[error("malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
}
