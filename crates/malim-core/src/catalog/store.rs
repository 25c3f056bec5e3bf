//! Port traits for the product cache: the remote document store with its
//! live "published products" feed, and the local snapshot store.
//!
//! Follows the same RPITIT pattern as the other repository traits:
//! implementations live in malim-infra.

use malim_types::catalog::{CatalogSnapshot, Product};
use malim_types::error::{RepositoryError, StoreError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

/// Largest identifier list a single batched point query may carry.
///
/// This is a limit of the store's `IN` operator, not a tuning knob.
pub const MAX_BATCH_IDS: usize = 10;

/// One delivery from the live feed: the complete published collection, or
/// the error that interrupted the subscription.
pub type FeedEvent = Result<Vec<Product>, StoreError>;

/// Repository trait for reading the published catalog.
pub trait ProductStore: Send + Sync {
    /// Full collection, filtered server-side to `publishOnline == true`.
    fn query_published(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Product>, StoreError>> + Send;

    /// Open a live feed pushing full-collection replacements.
    ///
    /// Dropping the returned [`ProductFeed`] unsubscribes.
    fn subscribe_published(&self) -> Result<ProductFeed, StoreError>;

    /// Point read of one document, regardless of its publish flag.
    ///
    /// Returns `StoreError::NotFound` when the identifier does not exist.
    fn get_one(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Product, StoreError>> + Send;

    /// Batched equality-in-identifier query. `ids` holds at most
    /// [`MAX_BATCH_IDS`] entries; unknown identifiers are simply absent
    /// from the result.
    fn get_many(
        &self,
        ids: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Product>, StoreError>> + Send;
}

/// Repository trait for the locally persisted catalog snapshot.
pub trait SnapshotStore: Send + Sync {
    fn load_snapshot(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<CatalogSnapshot>, RepositoryError>> + Send;

    fn save_snapshot(
        &self,
        snapshot: &CatalogSnapshot,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// Receiving half of a live catalog subscription.
///
/// Events arrive in the order the producer published them; the consumer
/// installs each one as it is received, so the most recently received
/// snapshot wins.
pub struct ProductFeed {
    events: mpsc::Receiver<FeedEvent>,
    cancel: CancellationToken,
}

/// Producing half of a live catalog subscription.
#[derive(Clone)]
pub struct FeedPublisher {
    events: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
}

impl ProductFeed {
    /// Create a connected publisher/feed pair with the given buffer.
    pub fn channel(capacity: usize) -> (FeedPublisher, ProductFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        (
            FeedPublisher {
                events: tx,
                cancel: cancel.clone(),
            },
            ProductFeed { events: rx, cancel },
        )
    }

    /// Wait for the next event. `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Result<FeedEvent, TryRecvError> {
        self.events.try_recv()
    }
}

impl Drop for ProductFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ProductFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductFeed")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl FeedPublisher {
    /// Deliver an event. Returns `false` when the subscriber has gone away.
    pub async fn publish(&self, event: FeedEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.events.send(event).await.is_ok()
    }

    /// Whether the subscriber unsubscribed.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.events.is_closed()
    }

    /// Resolves once the subscriber unsubscribes.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }
}
