//! Price reconciliation for client-submitted carts.
//!
//! The client's cart is untrusted input. Before a payment session is
//! created, every line item's unit price is re-derived from the catalog:
//! variant lookup first, product lookup second. The client-claimed price
//! survives only when no server-side match exists at all, and that gap is
//! logged and counted so such orders can be reviewed.
//!
//! Reconciliation must never block checkout on catalog downtime: any
//! failure fetching the catalog degrades to passing the cart through
//! unchanged.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use save_point_core::VariantId;

use crate::printful::{CatalogProduct, PrintfulClient};

/// Smallest quantity accepted for a line item.
pub const MIN_QUANTITY: i64 = 1;
/// Largest quantity accepted for a line item.
pub const MAX_QUANTITY: i64 = 99;

/// A client-submitted cart line item. Untrusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Catalog product identifier as the client sent it.
    pub id: String,
    /// Display name. Untrusted; replaced on reconciliation.
    pub name: String,
    /// Claimed unit price. Untrusted; replaced on reconciliation.
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub sync_variant_id: Option<VariantId>,
}

/// Result of reconciling a cart.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Items with server-derived prices where a match existed.
    pub validated: Vec<CartLineItem>,
    /// Human-readable rejections (currently: quantity violations).
    pub errors: Vec<String>,
    /// Items accepted with the client-claimed price because no catalog
    /// match was found. Nonzero values are a review signal.
    pub unmatched: usize,
}

impl Reconciliation {
    fn passthrough(items: Vec<CartLineItem>) -> Self {
        Self {
            validated: items,
            errors: Vec::new(),
            unmatched: 0,
        }
    }
}

/// Reconcile cart items against the live catalog.
///
/// With no Printful client configured (development mode) reconciliation is
/// bypassed entirely. A catalog fetch failure is absorbed: the original
/// items come back with no errors, because checkout must not be blocked by
/// catalog-service downtime.
pub async fn reconcile(
    printful: Option<&PrintfulClient>,
    items: Vec<CartLineItem>,
) -> Reconciliation {
    let Some(client) = printful else {
        debug!("no fulfillment credentials configured, skipping price reconciliation");
        return Reconciliation::passthrough(items);
    };

    match client.list_products().await {
        Ok(catalog) => reconcile_against(&catalog, items),
        Err(e) => {
            warn!(error = %e, "catalog fetch failed, accepting cart without reconciliation");
            Reconciliation::passthrough(items)
        }
    }
}

/// Reconcile cart items against an already-fetched catalog.
fn reconcile_against(catalog: &[CatalogProduct], items: Vec<CartLineItem>) -> Reconciliation {
    // Variant lookup carries a composite display name; product lookup keeps
    // the product's own name.
    let mut by_variant: HashMap<i64, (Decimal, String)> = HashMap::new();
    let mut by_product: HashMap<i64, (Decimal, String)> = HashMap::new();

    for product in catalog {
        by_product.insert(product.id.as_i64(), (product.price.amount, product.name.clone()));
        for variant in &product.variants {
            by_variant.insert(
                variant.id.as_i64(),
                (
                    variant.price.amount,
                    format!("{} - {}", product.name, variant.title),
                ),
            );
        }
    }

    let tolerance = Decimal::new(1, 2); // 0.01 currency units

    let mut validated = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    let mut unmatched = 0;

    for mut item in items {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&item.quantity) {
            errors.push(format!(
                "Invalid quantity {} for \"{}\": must be between {MIN_QUANTITY} and {MAX_QUANTITY}",
                item.quantity, item.name
            ));
            continue;
        }

        let server = item
            .sync_variant_id
            .and_then(|id| by_variant.get(&id.as_i64()))
            .or_else(|| {
                item.id
                    .parse::<i64>()
                    .ok()
                    .and_then(|id| by_product.get(&id))
            });

        match server {
            Some((server_price, server_name)) => {
                if (item.price - server_price).abs() > tolerance {
                    info!(
                        item_id = %item.id,
                        claimed = %item.price,
                        authoritative = %server_price,
                        "client price mismatch, using catalog price"
                    );
                    item.price = *server_price;
                    item.name = server_name.clone();
                }
                validated.push(item);
            }
            None => {
                // Trust-boundary gap: no catalog match, the client price is
                // all we have. Accept but flag for review.
                warn!(
                    item_id = %item.id,
                    claimed = %item.price,
                    "no catalog match for cart item, accepting client price"
                );
                unmatched += 1;
                validated.push(item);
            }
        }
    }

    Reconciliation {
        validated,
        errors,
        unmatched,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::printful::CatalogVariant;
    use rust_decimal_macros::dec;
    use save_point_core::{Money, ProductId};

    fn catalog() -> Vec<CatalogProduct> {
        vec![CatalogProduct {
            id: ProductId::new(371),
            name: "Retro Gaming Hoodie".to_string(),
            description: String::new(),
            price: Money::usd(dec!(45.00)),
            image: String::new(),
            category: "Hoodies".to_string(),
            tags: vec![],
            variants: vec![CatalogVariant {
                id: VariantId::new(5),
                title: "Large".to_string(),
                price: Money::usd(dec!(24.99)),
                available: true,
                sku: "HD-001-L".to_string(),
            }],
        }]
    }

    fn item(id: &str, price: Decimal, quantity: i64, variant: Option<i64>) -> CartLineItem {
        CartLineItem {
            id: id.to_string(),
            name: "Client Says".to_string(),
            price,
            quantity,
            image: None,
            sync_variant_id: variant.map(VariantId::new),
        }
    }

    #[test]
    fn test_variant_price_overrides_client_price() {
        // Client claims 99.99 for variant 5 whose authoritative price is 24.99
        let result = reconcile_against(&catalog(), vec![item("5", dec!(99.99), 1, Some(5))]);

        assert!(result.errors.is_empty());
        assert_eq!(result.unmatched, 0);
        assert_eq!(result.validated.len(), 1);
        assert_eq!(result.validated[0].price, dec!(24.99));
        assert_eq!(result.validated[0].name, "Retro Gaming Hoodie - Large");
        // And the processor-facing unit amount comes out in minor units
        assert_eq!(Money::usd(result.validated[0].price).to_minor_units(), 2499);
    }

    #[test]
    fn test_product_lookup_when_variant_missing() {
        let result = reconcile_against(&catalog(), vec![item("371", dec!(10.00), 2, None)]);

        assert_eq!(result.validated[0].price, dec!(45.00));
        assert_eq!(result.validated[0].name, "Retro Gaming Hoodie");
    }

    #[test]
    fn test_price_within_tolerance_left_alone() {
        let result = reconcile_against(&catalog(), vec![item("5", dec!(24.98), 1, Some(5))]);

        // Differs by exactly 0.01 - not "more than", so the item is untouched
        assert_eq!(result.validated[0].price, dec!(24.98));
        assert_eq!(result.validated[0].name, "Client Says");
    }

    #[test]
    fn test_quantity_out_of_range_rejected() {
        for quantity in [0, -1, 100] {
            let result =
                reconcile_against(&catalog(), vec![item("5", dec!(24.99), quantity, Some(5))]);
            assert_eq!(result.errors.len(), 1, "quantity {quantity}");
            assert!(result.validated.is_empty());
        }
    }

    #[test]
    fn test_quantity_bounds_accepted() {
        for quantity in [1, 99] {
            let result =
                reconcile_against(&catalog(), vec![item("5", dec!(24.99), quantity, Some(5))]);
            assert!(result.errors.is_empty(), "quantity {quantity}");
            assert_eq!(result.validated.len(), 1);
        }
    }

    #[test]
    fn test_unmatched_item_keeps_client_price_and_is_counted() {
        let result = reconcile_against(&catalog(), vec![item("9999", dec!(3.50), 1, None)]);

        assert!(result.errors.is_empty());
        assert_eq!(result.unmatched, 1);
        assert_eq!(result.validated[0].price, dec!(3.50));
        assert_eq!(result.validated[0].name, "Client Says");
    }

    #[tokio::test]
    async fn test_no_credentials_bypasses_reconciliation() {
        let items = vec![item("5", dec!(99.99), 1, Some(5))];
        let result = reconcile(None, items.clone()).await;

        assert_eq!(result.validated, items);
        assert!(result.errors.is_empty());
        assert_eq!(result.unmatched, 0);
    }
}
