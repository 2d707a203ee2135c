//! Catalog normalization: Printful sync products into the internal shape.
//!
//! Printful's sync payloads are permissive - variants may be half-synced,
//! prices arrive as strings, and images hide in several places. This module
//! turns them into [`CatalogProduct`]s the rest of the crate can trust, and
//! provides the placeholder catalog served when the upstream is unreachable
//! or unconfigured.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use save_point_core::{CurrencyCode, Money, ProductId, VariantId};

use super::types::{SyncProductDetail, SyncVariant};

/// Image served when a product has no usable image anywhere.
const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x400/1a1a1a/00ffff?text=Product";

/// A normalized catalog product.
///
/// Owned by the catalog fetch that produced it; never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Canonical unit price - the source of truth for checkout.
    pub price: Money,
    pub image: String,
    pub category: String,
    pub tags: Vec<String>,
    pub variants: Vec<CatalogVariant>,
}

/// A normalized, synced variant of a catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogVariant {
    /// The fulfillment-provider-recognized sync variant id.
    pub id: VariantId,
    pub title: String,
    /// Overrides the product price for this variant.
    pub price: Money,
    pub available: bool,
    pub sku: String,
}

/// Normalize a sync product detail into a [`CatalogProduct`].
///
/// Returns `None` (with a warning) for products that cannot be presented:
/// no synced variants, or no variant with a parseable positive price to
/// derive the product default from.
#[must_use]
pub fn normalize_product(detail: &SyncProductDetail) -> Option<CatalogProduct> {
    let product = &detail.sync_product;

    let synced: Vec<&SyncVariant> = detail.sync_variants.iter().filter(|v| v.synced).collect();
    if synced.is_empty() {
        warn!(product_id = product.id, name = %product.name, "product has no synced variants, skipping");
        return None;
    }

    // The product default price is computed from the first variant with a
    // valid price, not hardcoded - a product where nothing parses would
    // otherwise be presented at $0.
    let Some(default_price) = synced
        .iter()
        .find_map(|v| parse_retail_price(v.retail_price.as_deref()))
    else {
        warn!(product_id = product.id, name = %product.name, "no variant has a parseable price, skipping");
        return None;
    };

    let first = synced.first()?;
    let image = best_image(first, product.thumbnail_url.as_deref());
    let category = first
        .product
        .as_ref()
        .and_then(|p| p.type_name.clone())
        .unwrap_or_else(|| "General".to_string());

    let variants = synced
        .iter()
        .map(|v| CatalogVariant {
            id: VariantId::new(v.id),
            title: v.name.clone().unwrap_or_else(|| "Default".to_string()),
            price: Money::usd(
                parse_retail_price(v.retail_price.as_deref()).unwrap_or(default_price),
            ),
            available: v.synced,
            sku: v.sku.clone().unwrap_or_default(),
        })
        .collect();

    Some(CatalogProduct {
        id: ProductId::new(product.id),
        name: product.name.clone(),
        description: format!("High-quality {}", product.name),
        price: Money::usd(default_price),
        image,
        category: category.clone(),
        tags: vec![category.to_lowercase(), "retro".to_string(), "gaming".to_string()],
        variants,
    })
}

/// Parse a retail price string as a positive decimal.
fn parse_retail_price(raw: Option<&str>) -> Option<Decimal> {
    let parsed: Decimal = raw?.trim().parse().ok()?;
    (parsed > Decimal::ZERO).then_some(parsed)
}

/// Pick the best available image for a variant.
///
/// Preference order: preview file, default file, the variant's catalog
/// product image, the sync product thumbnail, then a placeholder.
fn best_image(variant: &SyncVariant, thumbnail: Option<&str>) -> String {
    variant
        .files
        .iter()
        .find(|f| f.kind == "preview")
        .and_then(|f| f.preview_url.clone())
        .or_else(|| {
            variant
                .files
                .iter()
                .find(|f| f.kind == "default")
                .and_then(|f| f.preview_url.clone())
        })
        .or_else(|| variant.product.as_ref().and_then(|p| p.image.clone()))
        .or_else(|| thumbnail.map(String::from))
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())
}

/// Static placeholder catalog served when Printful is unreachable or no
/// credentials are configured.
#[must_use]
pub fn fallback_catalog() -> Vec<CatalogProduct> {
    fn product(
        id: i64,
        name: &str,
        price: &str,
        image: &str,
        description: &str,
        category: &str,
        variants: Vec<CatalogVariant>,
    ) -> CatalogProduct {
        let price = Money::usd(price.parse().unwrap_or(Decimal::ZERO));
        CatalogProduct {
            id: ProductId::new(id),
            name: name.to_string(),
            description: description.to_string(),
            price,
            image: image.to_string(),
            category: category.to_string(),
            tags: vec![category.to_lowercase(), "gaming".to_string(), "retro".to_string()],
            variants,
        }
    }

    fn variant(id: i64, title: &str, price: &str, sku: &str) -> CatalogVariant {
        CatalogVariant {
            id: VariantId::new(id),
            title: title.to_string(),
            price: Money::new(
                price.parse().unwrap_or(Decimal::ZERO),
                CurrencyCode::USD,
            ),
            available: true,
            sku: sku.to_string(),
        }
    }

    vec![
        product(
            1,
            "Cozy Gamer Vibes Kids Tee",
            "17.00",
            "https://via.placeholder.com/400x400/1a1a1a/00ffff?text=Gamer+Tee",
            "Perfect for young gamers who love retro vibes",
            "Kids",
            vec![variant(1, "Default", "17.00", "GT-001")],
        ),
        product(
            2,
            "Bubble-free Stickers",
            "2.50",
            "https://via.placeholder.com/400x400/1a1a1a/ff00ff?text=Stickers",
            "High-quality gaming stickers for your setup",
            "Accessories",
            vec![variant(2, "Default", "2.50", "ST-001")],
        ),
        product(
            3,
            "Retro Gaming Hoodie",
            "45.00",
            "https://via.placeholder.com/400x400/1a1a1a/00ff00?text=Hoodie",
            "Stay cozy while gaming with this retro hoodie",
            "Hoodies",
            vec![
                variant(3, "Small", "45.00", "HD-001-S"),
                variant(4, "Medium", "45.00", "HD-001-M"),
                variant(5, "Large", "45.00", "HD-001-L"),
            ],
        ),
        product(
            4,
            "Pixel Art Fanny Pack",
            "25.00",
            "https://via.placeholder.com/400x400/1a1a1a/ffff00?text=Fanny+Pack",
            "Carry your essentials in retro style",
            "Accessories",
            vec![variant(6, "Default", "25.00", "FP-001")],
        ),
    ]
}
