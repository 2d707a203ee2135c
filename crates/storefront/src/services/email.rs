//! Order confirmation email service.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plaintext
//! templates. Email is strictly best-effort: an unconfigured transport or a
//! failed send produces a `false` marker and a log line, never an error
//! that could interrupt the fulfillment pipeline.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Everything the confirmation email renders.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub customer_email: String,
    pub customer_name: String,
    /// The payment session id doubles as the customer-facing order number.
    pub order_number: String,
    pub items: Vec<ConfirmationItem>,
    /// Preformatted total, e.g. "49.98".
    pub total: String,
    pub address: ConfirmationAddress,
    pub shop_url: String,
}

/// One itemized line.
#[derive(Debug, Clone)]
pub struct ConfirmationItem {
    pub name: String,
    pub quantity: i64,
    /// Preformatted unit price, e.g. "24.99".
    pub price: String,
}

/// Shipping address block.
#[derive(Debug, Clone)]
pub struct ConfirmationAddress {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub zip: String,
    pub country_code: String,
}

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    data: &'a OrderConfirmation,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    data: &'a OrderConfirmation,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// SMTP-backed email service.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be constructed.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send an order confirmation email.
    ///
    /// # Errors
    ///
    /// Returns error if the templates fail to render or the send fails.
    pub async fn send_order_confirmation(
        &self,
        data: &OrderConfirmation,
    ) -> Result<(), EmailError> {
        let html = OrderConfirmationHtml { data }.render()?;
        let text = OrderConfirmationText { data }.render()?;
        let subject = format!("Order Confirmation - {}", data.order_number);

        let email = Message::builder()
            .from(
                format!("\"Save Point Apparel\" <{}>", self.from_address)
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(data
                .customer_email
                .parse()
                .map_err(|_| EmailError::InvalidAddress(data.customer_email.clone()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %data.customer_email, order = %data.order_number, "confirmation email sent");
        Ok(())
    }
}

/// Best-effort notification sender wrapping an optional [`EmailService`].
#[derive(Clone)]
pub struct Notifier {
    service: Option<EmailService>,
}

impl Notifier {
    /// Build a notifier from optional SMTP configuration.
    ///
    /// A config that fails to produce a transport degrades to the
    /// disabled notifier rather than failing startup.
    #[must_use]
    pub fn from_config(config: Option<&EmailConfig>) -> Self {
        let service = config.and_then(|c| match EmailService::new(c) {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::warn!(error = %e, "SMTP transport unavailable, emails disabled");
                None
            }
        });

        Self { service }
    }

    /// Send an order confirmation, reporting success as a marker.
    ///
    /// Returns `false` when the transport is unconfigured or the send
    /// failed; both are logged and neither interrupts the caller.
    pub async fn send_order_confirmation(&self, data: &OrderConfirmation) -> bool {
        let Some(service) = &self.service else {
            tracing::info!(order = %data.order_number, "mail transport not configured, skipping confirmation email");
            return false;
        };

        match service.send_order_confirmation(data).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(order = %data.order_number, error = %e, "failed to send confirmation email");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn confirmation() -> OrderConfirmation {
        OrderConfirmation {
            customer_email: "p1@example.com".to_string(),
            customer_name: "Player One".to_string(),
            order_number: "cs_test_123".to_string(),
            items: vec![
                ConfirmationItem {
                    name: "Retro Gaming Hoodie - Large".to_string(),
                    quantity: 1,
                    price: "45.00".to_string(),
                },
                ConfirmationItem {
                    name: "Bubble-free Stickers".to_string(),
                    quantity: 3,
                    price: "2.50".to_string(),
                },
            ],
            total: "52.50".to_string(),
            address: ConfirmationAddress {
                name: "Player One".to_string(),
                address1: "1 Arcade Way".to_string(),
                address2: Some("Unit 7".to_string()),
                city: "Austin".to_string(),
                state_code: "TX".to_string(),
                zip: "78701".to_string(),
                country_code: "US".to_string(),
            },
            shop_url: "https://shop.example.com/shop".to_string(),
        }
    }

    #[test]
    fn test_html_template_renders_order_details() {
        let data = confirmation();
        let html = OrderConfirmationHtml { data: &data }.render().unwrap();

        assert!(html.contains("cs_test_123"));
        assert!(html.contains("Retro Gaming Hoodie - Large"));
        assert!(html.contains("$45.00"));
        assert!(html.contains("Total: $52.50"));
        assert!(html.contains("Unit 7"));
        assert!(html.contains("Austin, TX 78701"));
    }

    #[test]
    fn test_text_template_renders_order_details() {
        let data = confirmation();
        let text = OrderConfirmationText { data: &data }.render().unwrap();

        assert!(text.contains("Order Number: cs_test_123"));
        assert!(text.contains("Bubble-free Stickers x3 - $2.50"));
        assert!(text.contains("TOTAL: $52.50"));
        assert!(text.contains("1 Arcade Way"));
    }

    #[test]
    fn test_html_template_omits_missing_address2() {
        let mut data = confirmation();
        data.address.address2 = None;
        let html = OrderConfirmationHtml { data: &data }.render().unwrap();
        assert!(!html.contains("Unit 7"));
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_returns_failure_marker() {
        let notifier = Notifier::from_config(None);
        let sent = notifier.send_order_confirmation(&confirmation()).await;
        assert!(!sent);
    }
}
