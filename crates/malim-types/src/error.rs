use thiserror::Error;

/// Errors surfaced by the product catalog cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("product '{0}' not found")]
    NotFound(String),

    /// The product exists but is not published online.
    #[error("product '{0}' is not available")]
    NotAvailable(String),

    #[error("catalog sync failed: {0}")]
    SyncFailure(String),

    #[error("invalid product record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },
}

impl CatalogError {
    /// Whether callers should treat this error as "no such product".
    ///
    /// Unpublished and invalid records are never shown to shoppers, so they
    /// collapse into the same outcome as a missing document.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            CatalogError::NotFound(_)
                | CatalogError::NotAvailable(_)
                | CatalogError::InvalidRecord { .. }
        )
    }
}

/// Errors from the remote document store (used by `ProductStore` in malim-core).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document store unreachable: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("document not found")]
    NotFound,

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Errors from the style-assistant backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatBackendError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("{0}")]
    Rejected(String),

    #[error("authentication token expired")]
    TokenExpired,

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Errors from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Errors from the shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("no cart line with SKU '{0}'")]
    ItemNotFound(String),

    #[error("a size must be selected for this product")]
    SizeRequired,

    #[error("product '{product_id}' has no variant '{color}'")]
    UnknownVariant { product_id: String, color: String },

    #[error("product '{product_id}' has no size '{size}' in '{color}'")]
    UnknownSize {
        product_id: String,
        color: String,
        size: String,
    },
}

/// Errors from local persistence (snapshot and cart repositories).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::NotAvailable("MAL-VES-001".to_string());
        assert_eq!(err.to_string(), "product 'MAL-VES-001' is not available");
    }

    #[test]
    fn test_not_available_treated_as_missing() {
        assert!(CatalogError::NotFound("a".into()).is_missing());
        assert!(CatalogError::NotAvailable("a".into()).is_missing());
        assert!(!CatalogError::SyncFailure("offline".into()).is_missing());
    }

    #[test]
    fn test_backend_status_display() {
        let err = ChatBackendError::Status(502);
        assert_eq!(err.to_string(), "HTTP error! status: 502");
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
