//! Catalog types: products, color variants, sizes and the persisted snapshot.
//!
//! Field names follow the remote document layout (`publicPrice`,
//! `publishOnline`, `dateAdded`, ...) so the same records round-trip between
//! the document store, the local snapshot and the CLI's JSON output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Stock count at or below which a size is reported as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 3;

/// A catalog entry.
///
/// `id` doubles as the document key in the remote store and as the SKU the
/// style assistant mentions in its replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub public_price: f64,
    /// Discount in percent, 0 means no offer.
    #[serde(default)]
    pub offer_percentage: f64,
    #[serde(default)]
    pub publish_online: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Milliseconds since the Unix epoch. Drives "newest first" ordering.
    #[serde(default)]
    pub date_added: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_details: Option<String>,
}

/// A color option of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub color_name: String,
    #[serde(default)]
    pub hex_color: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
}

/// Stock for one size of a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeStock {
    pub size: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub variant_sku: String,
}

impl Product {
    /// Only published products are ever shown to shoppers.
    pub fn is_published(&self) -> bool {
        self.publish_online
    }

    pub fn has_offer(&self) -> bool {
        self.offer_percentage > 0.0
    }

    /// Price after applying `offer_percentage`.
    pub fn discounted_price(&self) -> f64 {
        if !self.has_offer() {
            return self.public_price;
        }
        self.public_price - (self.public_price * self.offer_percentage) / 100.0
    }

    /// First image of the first variant.
    pub fn main_image(&self) -> Option<&str> {
        self.variants
            .first()
            .and_then(|v| v.image_urls.first())
            .map(String::as_str)
    }

    pub fn color_names(&self) -> Vec<String> {
        self.variants
            .iter()
            .map(|v| v.color_name.clone())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Look up a variant by color name (case-insensitive).
    pub fn variant(&self, color: &str) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.color_name.eq_ignore_ascii_case(color))
    }

    /// Total units in stock across every variant and size, saturating at
    /// `u32::MAX`.
    pub fn total_stock(&self) -> u32 {
        self.variants
            .iter()
            .flat_map(|v| v.sizes.iter())
            .fold(0u32, |total, s| total.saturating_add(s.stock))
    }

    /// Validate a record coming from outside the process.
    ///
    /// Rejects records whose shape cannot be trusted: empty id or name,
    /// negative or non-finite price, offer outside 0..=100.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidRecord {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if !self.public_price.is_finite() || self.public_price < 0.0 {
            return Err(invalid("publicPrice must be a non-negative number"));
        }
        if !(0.0..=100.0).contains(&self.offer_percentage) {
            return Err(invalid("offerPercentage must be between 0 and 100"));
        }
        Ok(())
    }
}

impl Variant {
    /// A variant without sizes needs no size selection.
    pub fn requires_size(&self) -> bool {
        !self.sizes.is_empty()
    }

    pub fn size(&self, size: &str) -> Option<&SizeStock> {
        self.sizes.iter().find(|s| s.size.eq_ignore_ascii_case(size))
    }
}

/// Availability label for a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// No units left; the boutique takes it as a special order.
    OutOfStock,
    Low(u32),
    InStock,
}

impl StockStatus {
    pub fn from_stock(stock: u32) -> Self {
        match stock {
            0 => StockStatus::OutOfStock,
            n if n <= LOW_STOCK_THRESHOLD => StockStatus::Low(n),
            _ => StockStatus::InStock,
        }
    }

    pub fn label(&self) -> String {
        match self {
            StockStatus::OutOfStock => "Bajo Pedido".to_string(),
            StockStatus::Low(n) => format!("Solo {n} disponibles"),
            StockStatus::InStock => "En Stock".to_string(),
        }
    }
}

/// Locally persisted copy of the published catalog.
///
/// Exists only to avoid an empty catalog on restart; it is never treated as
/// authoritative once older than the freshness window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub timestamp: DateTime<Utc>,
    pub products: Vec<Product>,
}

impl CatalogSnapshot {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.timestamp) < ttl
    }
}

/// Compact projection of a product for card-style rendering next to an
/// assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCard {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub offer: f64,
    pub final_price: f64,
    pub category: String,
    pub image: Option<String>,
    pub colors: Vec<String>,
    pub description: String,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.id.clone(),
            name: product.name.clone(),
            price: product.public_price,
            offer: product.offer_percentage,
            final_price: product.discounted_price(),
            category: product.category.clone(),
            image: product.main_image().map(str::to_string),
            colors: product.color_names(),
            description: product.short_details.clone().unwrap_or_default(),
        }
    }
}
