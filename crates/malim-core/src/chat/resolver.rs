//! Resolution of SKUs mentioned by the assistant into catalog products.

use malim_types::catalog::Product;

use crate::catalog::{ProductCache, ProductStore, SnapshotStore};

/// Something that can turn SKUs into published products.
///
/// Unknown and unpublished SKUs are silently omitted.
pub trait ProductResolver: Send {
    fn resolve_published(
        &mut self,
        skus: &[String],
    ) -> impl std::future::Future<Output = Vec<Product>> + Send;
}

impl<S, P> ProductResolver for ProductCache<S, P>
where
    S: ProductStore,
    P: SnapshotStore,
{
    async fn resolve_published(&mut self, skus: &[String]) -> Vec<Product> {
        self.fetch_by_ids(skus)
            .await
            .into_iter()
            .filter(Product::is_published)
            .collect()
    }
}
