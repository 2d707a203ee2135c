//! Business services for the checkout pipeline.
//!
//! - [`pricing`] - reconciles client-submitted cart prices against the
//!   catalog before a payment session is created
//! - [`fulfillment`] - submits paid orders to the fulfillment provider
//! - [`email`] - sends order confirmation emails

pub mod email;
pub mod fulfillment;
pub mod pricing;
