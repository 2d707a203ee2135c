//! Order repository for database operations.
//!
//! The webhook handler is the only writer. Creation goes through
//! [`OrderRepository::create_if_absent`], which leans on the UNIQUE index
//! over `stripe_session_id` so that duplicate or concurrent webhook
//! deliveries for the same session can never produce two orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use save_point_core::{Email, Money, OrderStatus, PaymentStatus, VariantId};

use super::RepositoryError;

/// A persisted order row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub stripe_session_id: String,
    /// Set once fulfillment submission succeeds; `NULL` means the order
    /// needs manual follow-up on the fulfillment side.
    pub printful_order_id: Option<String>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_status: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted order line item.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: Uuid,
    pub product_id: String,
    pub product_name: String,
    pub sync_variant_id: Option<i64>,
    pub quantity: i32,
    pub price: Decimal,
}

/// A persisted shipping address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShippingAddressRow {
    pub id: i64,
    pub order_id: Uuid,
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub country_code: String,
    pub zip: String,
    pub phone: Option<String>,
}

/// An order with its items and shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemRow>,
    pub shipping_address: Option<ShippingAddressRow>,
}

/// Input for creating an order from a completed checkout session.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub stripe_session_id: String,
    pub customer_email: Email,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub total: Money,
    pub payment_status: PaymentStatus,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: NewShippingAddress,
}

/// Input line item.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: String,
    pub sync_variant_id: Option<VariantId>,
    pub quantity: i32,
    /// Unit price in the currency's standard unit.
    pub price: Decimal,
}

/// Input shipping address.
#[derive(Debug, Clone)]
pub struct NewShippingAddress {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub country_code: String,
    pub zip: String,
    pub phone: Option<String>,
}

const ORDER_COLUMNS: &str = "id, stripe_session_id, printful_order_id, customer_email, \
     customer_name, customer_phone, total_amount, currency, payment_status, status, \
     created_at, updated_at";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order unless one already exists for the session.
    ///
    /// Returns `Ok(None)` when a row for the session id is already present;
    /// the caller treats that as the idempotent no-op path for redelivered
    /// webhooks. Items and the shipping address are written in the same
    /// transaction as the order row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn create_if_absent(&self, new: &NewOrder) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order: Option<Order> = sqlx::query_as(&format!(
            "INSERT INTO orders (stripe_session_id, customer_email, customer_name, \
                 customer_phone, total_amount, currency, payment_status, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (stripe_session_id) DO NOTHING
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&new.stripe_session_id)
        .bind(new.customer_email.as_str())
        .bind(&new.customer_name)
        .bind(&new.customer_phone)
        .bind(new.total.amount)
        .bind(new.total.currency_code.code())
        .bind(new.payment_status.as_str())
        .bind(OrderStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            // Conflict on the session id: another delivery got here first
            return Ok(None);
        };

        for item in &new.items {
            sqlx::query(
                "INSERT INTO order_item (order_id, product_id, product_name, \
                     sync_variant_id, quantity, price)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order.id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.sync_variant_id.map(|id| id.as_i64()))
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        let addr = &new.shipping_address;
        sqlx::query(
            "INSERT INTO shipping_address (order_id, name, address1, address2, city, \
                 state_code, country_code, zip, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order.id)
        .bind(&addr.name)
        .bind(&addr.address1)
        .bind(&addr.address2)
        .bind(&addr.city)
        .bind(&addr.state_code)
        .bind(&addr.country_code)
        .bind(&addr.zip)
        .bind(&addr.phone)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(order))
    }

    /// Get an order with items and address by its payment session id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<OrderDetails>, RepositoryError> {
        let order: Option<Order> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE stripe_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, product_name, sync_variant_id, quantity, price
             FROM order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(order.id)
        .fetch_all(self.pool)
        .await?;

        let shipping_address: Option<ShippingAddressRow> = sqlx::query_as(
            "SELECT id, order_id, name, address1, address2, city, state_code, \
                 country_code, zip, phone
             FROM shipping_address WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_optional(self.pool)
        .await?;

        Ok(Some(OrderDetails {
            order,
            items,
            shipping_address,
        }))
    }

    /// Record the fulfillment provider's order id and move the order to
    /// `Processing`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order exists for the
    /// session id, `RepositoryError::Database` for other failures.
    pub async fn set_printful_order_id(
        &self,
        session_id: &str,
        printful_order_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET printful_order_id = $2, status = $3, updated_at = now()
             WHERE stripe_session_id = $1",
        )
        .bind(session_id)
        .bind(printful_order_id)
        .bind(OrderStatus::Processing)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Update an order's lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist,
    /// `RepositoryError::Database` for other failures.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(order_id)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
