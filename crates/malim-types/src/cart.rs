//! Shopping cart line items.

use serde::{Deserialize, Serialize};

/// One line of the cart, keyed by `variant_sku`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub variant_sku: String,
    pub name: String,
    pub color: String,
    pub size: Option<String>,
    /// Unit price after discount.
    pub price: f64,
    pub quantity: u32,
    pub image: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}
