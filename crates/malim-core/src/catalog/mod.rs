pub mod cache;
pub mod query;
pub mod store;

pub use cache::{ProductCache, ProductCacheState};
pub use query::{CatalogQuery, CatalogSort};
pub use store::{FeedEvent, FeedPublisher, MAX_BATCH_IDS, ProductFeed, ProductStore, SnapshotStore};
