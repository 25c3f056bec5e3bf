//! Shopping cart keyed by variant SKU.

pub mod repository;

pub use repository::CartRepository;

use malim_types::cart::CartItem;
use malim_types::catalog::Product;
use malim_types::error::CartError;

/// Effect of a cart mutation, for user-facing feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    Added,
    QuantityIncreased { quantity: u32 },
    Updated { quantity: u32 },
    Removed,
}

/// Ordered cart lines, at most one per `variant_sku`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Build a cart from stored lines, merging any duplicate SKUs.
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::default();
        for item in items.into_iter().filter(|i| i.quantity > 0) {
            match cart.items.iter_mut().find(|i| i.variant_sku == item.variant_sku) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, variant_sku: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.variant_sku == variant_sku)
    }

    /// Add a line; an existing SKU has its quantity increased instead.
    ///
    /// A quantity that would overflow leaves the cart unchanged.
    pub fn add(&mut self, item: CartItem) -> Result<CartChange, CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        match self.items.iter_mut().find(|i| i.variant_sku == item.variant_sku) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(CartError::InvalidQuantity)?;
                Ok(CartChange::QuantityIncreased {
                    quantity: existing.quantity,
                })
            }
            None => {
                self.items.push(item);
                Ok(CartChange::Added)
            }
        }
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, variant_sku: &str, quantity: u32) -> Result<CartChange, CartError> {
        if quantity == 0 {
            self.remove(variant_sku)?;
            return Ok(CartChange::Removed);
        }
        let line = self
            .items
            .iter_mut()
            .find(|i| i.variant_sku == variant_sku)
            .ok_or_else(|| CartError::ItemNotFound(variant_sku.to_string()))?;
        line.quantity = quantity;
        Ok(CartChange::Updated { quantity })
    }

    pub fn remove(&mut self, variant_sku: &str) -> Result<CartItem, CartError> {
        let pos = self
            .items
            .iter()
            .position(|i| i.variant_sku == variant_sku)
            .ok_or_else(|| CartError::ItemNotFound(variant_sku.to_string()))?;
        Ok(self.items.remove(pos))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Units across all lines.
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, i| total.saturating_add(i.quantity))
    }

    pub fn total_price(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Build a cart line from a product and a color/size selection.
    ///
    /// A size is required when the chosen variant lists sizes. Sizes without
    /// their own SKU fall back to `{product}-{color}-{size}`.
    pub fn line_for(
        product: &Product,
        color: &str,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<CartItem, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let variant = product.variant(color).ok_or_else(|| CartError::UnknownVariant {
            product_id: product.id.clone(),
            color: color.to_string(),
        })?;

        let (size, variant_sku) = if variant.requires_size() {
            let wanted = size.ok_or(CartError::SizeRequired)?;
            let stock = variant.size(wanted).ok_or_else(|| CartError::UnknownSize {
                product_id: product.id.clone(),
                color: variant.color_name.clone(),
                size: wanted.to_string(),
            })?;
            let sku = if stock.variant_sku.is_empty() {
                format!("{}-{}-{}", product.id, variant.color_name, stock.size)
            } else {
                stock.variant_sku.clone()
            };
            (Some(stock.size.clone()), sku)
        } else {
            (None, format!("{}-{}", product.id, variant.color_name))
        };

        Ok(CartItem {
            product_id: product.id.clone(),
            variant_sku,
            name: product.name.clone(),
            color: variant.color_name.clone(),
            size,
            price: product.discounted_price(),
            quantity,
            image: variant
                .image_urls
                .first()
                .cloned()
                .or_else(|| product.main_image().map(str::to_string)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use malim_types::catalog::{SizeStock, Variant};

    fn blouse() -> Product {
        Product {
            id: "MAL-BLU-001".to_string(),
            name: "Blusa de lino".to_string(),
            category: "blusas".to_string(),
            public_price: 400.0,
            offer_percentage: 25.0,
            publish_online: true,
            variants: vec![
                Variant {
                    color_name: "Blanco".to_string(),
                    hex_color: "#ffffff".to_string(),
                    image_urls: vec!["https://cdn.example/blanco.jpg".to_string()],
                    sizes: vec![
                        SizeStock {
                            size: "M".to_string(),
                            stock: 4,
                            variant_sku: "MAL-BLU-001-BLA-M".to_string(),
                        },
                        SizeStock {
                            size: "L".to_string(),
                            stock: 0,
                            variant_sku: String::new(),
                        },
                    ],
                },
                Variant {
                    color_name: "Negro".to_string(),
                    hex_color: "#000000".to_string(),
                    image_urls: vec![],
                    sizes: vec![],
                },
            ],
            date_added: 1,
            short_details: None,
        }
    }

    #[test]
    fn line_for_uses_variant_sku_and_discount() {
        let line = Cart::line_for(&blouse(), "blanco", Some("m"), 2).unwrap();
        assert_eq!(line.variant_sku, "MAL-BLU-001-BLA-M");
        assert_eq!(line.size.as_deref(), Some("M"));
        assert!((line.price - 300.0).abs() < f64::EPSILON);
        assert_eq!(line.image.as_deref(), Some("https://cdn.example/blanco.jpg"));
    }

    #[test]
    fn line_for_falls_back_to_composed_sku() {
        let sized = Cart::line_for(&blouse(), "Blanco", Some("L"), 1).unwrap();
        assert_eq!(sized.variant_sku, "MAL-BLU-001-Blanco-L");

        let sizeless = Cart::line_for(&blouse(), "Negro", None, 1).unwrap();
        assert_eq!(sizeless.variant_sku, "MAL-BLU-001-Negro");
        assert!(sizeless.size.is_none());
        // No image of its own, falls back to the product's main image.
        assert_eq!(sizeless.image.as_deref(), Some("https://cdn.example/blanco.jpg"));
    }

    #[test]
    fn line_for_validates_selection() {
        let product = blouse();
        assert_eq!(
            Cart::line_for(&product, "Blanco", None, 1),
            Err(CartError::SizeRequired)
        );
        assert!(matches!(
            Cart::line_for(&product, "Rojo", None, 1),
            Err(CartError::UnknownVariant { .. })
        ));
        assert!(matches!(
            Cart::line_for(&product, "Blanco", Some("XS"), 1),
            Err(CartError::UnknownSize { .. })
        ));
        assert_eq!(
            Cart::line_for(&product, "Negro", None, 0),
            Err(CartError::InvalidQuantity)
        );
    }

    #[test]
    fn adding_same_sku_merges_quantity() {
        let mut cart = Cart::default();
        let line = Cart::line_for(&blouse(), "Blanco", Some("M"), 1).unwrap();

        assert_eq!(cart.add(line.clone()).unwrap(), CartChange::Added);
        assert_eq!(
            cart.add(CartItem { quantity: 2, ..line }).unwrap(),
            CartChange::QuantityIncreased { quantity: 3 }
        );
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 3);
        assert!((cart.total_price() - 900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::default();
        cart.add(Cart::line_for(&blouse(), "Negro", None, 1).unwrap())
            .unwrap();

        assert_eq!(
            cart.update_quantity("MAL-BLU-001-Negro", 5).unwrap(),
            CartChange::Updated { quantity: 5 }
        );
        assert_eq!(
            cart.update_quantity("MAL-BLU-001-Negro", 0).unwrap(),
            CartChange::Removed
        );
        assert!(cart.is_empty());
        assert_eq!(
            cart.update_quantity("MAL-BLU-001-Negro", 1),
            Err(CartError::ItemNotFound("MAL-BLU-001-Negro".to_string()))
        );
    }

    #[test]
    fn from_items_merges_duplicates() {
        let line = Cart::line_for(&blouse(), "Negro", None, 1).unwrap();
        let cart = Cart::from_items(vec![line.clone(), line.clone(), CartItem { quantity: 0, ..line }]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn add_rejects_quantity_overflow() {
        let mut cart = Cart::default();
        let line = Cart::line_for(&blouse(), "Negro", None, u32::MAX).unwrap();
        cart.add(line.clone()).unwrap();

        assert_eq!(
            cart.add(CartItem { quantity: 1, ..line }),
            Err(CartError::InvalidQuantity)
        );
        assert_eq!(cart.get("MAL-BLU-001-Negro").unwrap().quantity, u32::MAX);
    }

    #[test]
    fn from_items_saturates_stored_duplicates() {
        let line = Cart::line_for(&blouse(), "Negro", None, u32::MAX).unwrap();
        let other = Cart::line_for(&blouse(), "Blanco", Some("M"), 3).unwrap();
        let cart = Cart::from_items(vec![line.clone(), CartItem { quantity: 5, ..line }, other]);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.get("MAL-BLU-001-Negro").unwrap().quantity, u32::MAX);
        assert_eq!(cart.total_items(), u32::MAX);
    }
}
