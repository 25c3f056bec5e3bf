//! Cart repository trait definition.

use malim_types::cart::CartItem;
use malim_types::error::RepositoryError;

/// Repository trait for cart persistence.
///
/// Implementations live in malim-infra (e.g., SqliteCartRepository). The
/// cart is stored as a whole: `save` replaces every line.
pub trait CartRepository: Send + Sync {
    /// All stored lines, in the order they were added.
    fn load(&self) -> impl std::future::Future<Output = Result<Vec<CartItem>, RepositoryError>> + Send;

    /// Replace the stored cart with `items`.
    fn save(
        &self,
        items: &[CartItem],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn clear(&self) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
