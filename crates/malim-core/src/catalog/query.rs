//! Browsing filters over the cached catalog.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use malim_types::catalog::Product;

/// Ordering of a catalog listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogSort {
    /// `date_added` descending, the cache's own order.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl fmt::Display for CatalogSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSort::Newest => write!(f, "newest"),
            CatalogSort::PriceAsc => write!(f, "price-asc"),
            CatalogSort::PriceDesc => write!(f, "price-desc"),
            CatalogSort::Name => write!(f, "name"),
        }
    }
}

impl FromStr for CatalogSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(CatalogSort::Newest),
            "price-asc" | "price_asc" => Ok(CatalogSort::PriceAsc),
            "price-desc" | "price_desc" => Ok(CatalogSort::PriceDesc),
            "name" => Ok(CatalogSort::Name),
            other => Err(format!("invalid sort order: '{other}'")),
        }
    }
}

/// Search and filter criteria for listing products.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Case-insensitive substring over name, category and description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub offers_only: bool,
    pub sort: CatalogSort,
}

impl CatalogQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if self.offers_only && !product.has_offer() {
            return false;
        }
        if let Some(category) = &self.category {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        let search = self.search.as_deref().map(str::trim).unwrap_or_default();
        if search.is_empty() {
            return true;
        }
        let needle = search.to_lowercase();
        [
            Some(product.name.as_str()),
            Some(product.category.as_str()),
            product.short_details.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(&needle))
    }

    /// Filter and sort `products`, which are expected newest first.
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut selected: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            CatalogSort::Newest => {}
            CatalogSort::PriceAsc => selected.sort_by(|a, b| price_cmp(a, b)),
            CatalogSort::PriceDesc => selected.sort_by(|a, b| price_cmp(b, a)),
            CatalogSort::Name => {
                selected.sort_by_key(|p| p.name.to_lowercase());
            }
        }
        selected
    }
}

fn price_cmp(a: &Product, b: &Product) -> Ordering {
    a.discounted_price().total_cmp(&b.discounted_price())
}
