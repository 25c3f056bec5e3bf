//! Stale-while-revalidate cache of the published catalog.
//!
//! `ProductCache` owns the visible product list and an id-keyed index, hydrates
//! them from a persisted snapshot when it is still fresh, and converges toward
//! the remote store through a live feed of full-collection replacements.
//! Point fetches fill gaps for products the feed has not delivered yet.
//!
//! All mutation goes through `&mut self`, so each operation runs to
//! completion before the next one observes the state.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use malim_types::catalog::{CatalogSnapshot, Product};
use malim_types::error::{CatalogError, StoreError};

use super::store::{FeedEvent, MAX_BATCH_IDS, ProductFeed, ProductStore, SnapshotStore};

/// Default freshness window of the persisted snapshot.
pub const DEFAULT_SNAPSHOT_TTL_SECS: i64 = 600;

/// Observable state of the cache.
#[derive(Debug, Clone, Default)]
pub struct ProductCacheState {
    by_id: HashMap<String, Product>,
    /// Materialized from `by_id`, newest first.
    products: Vec<Product>,
    loading: bool,
    error: Option<CatalogError>,
    last_synced_at: Option<DateTime<Utc>>,
}

impl ProductCacheState {
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&CatalogError> {
        self.error.as_ref()
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Install a full collection, replacing everything.
    ///
    /// Duplicate ids collapse to the last occurrence; the list is sorted by
    /// `date_added` descending with ties kept in arrival order.
    fn replace_all(&mut self, products: Vec<Product>) {
        let mut by_id = HashMap::with_capacity(products.len());
        let mut order = Vec::with_capacity(products.len());
        for product in products {
            if !by_id.contains_key(&product.id) {
                order.push(product.id.clone());
            }
            by_id.insert(product.id.clone(), product);
        }

        let mut list: Vec<Product> = order
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();
        // `sort_by` is stable.
        list.sort_by(|a, b| b.date_added.cmp(&a.date_added));

        self.by_id = by_id;
        self.products = list;
    }

    /// Merge a single product into the current state.
    fn upsert(&mut self, product: Product) {
        if let Some(pos) = self.products.iter().position(|p| p.id == product.id) {
            self.products.remove(pos);
        }
        let at = self
            .products
            .partition_point(|p| p.date_added >= product.date_added);
        self.products.insert(at, product.clone());
        self.by_id.insert(product.id.clone(), product);
    }
}

/// Admit a remote record into the cache, or explain why it is refused.
fn admit(product: Product) -> Result<Product, CatalogError> {
    product.validate()?;
    if !product.is_published() {
        return Err(CatalogError::NotAvailable(product.id));
    }
    Ok(product)
}

/// Keep only valid, published records of a full collection.
fn admit_all(products: Vec<Product>) -> Vec<Product> {
    let total = products.len();
    let admitted: Vec<Product> = products
        .into_iter()
        .filter_map(|p| match admit(p) {
            Ok(p) => Some(p),
            Err(err) => {
                debug!(error = %err, "dropping product from collection");
                None
            }
        })
        .collect();
    if admitted.len() != total {
        warn!(
            dropped = total - admitted.len(),
            "collection contained unpublished or invalid products"
        );
    }
    admitted
}

/// Eventually-consistent view of the published catalog.
pub struct ProductCache<S, P> {
    store: S,
    snapshots: P,
    state: ProductCacheState,
    feed: Option<ProductFeed>,
    snapshot_ttl: Duration,
    batch_size: usize,
}

impl<S, P> ProductCache<S, P>
where
    S: ProductStore,
    P: SnapshotStore,
{
    /// Create an empty cache over the given store and snapshot persistence.
    pub fn new(store: S, snapshots: P) -> Self {
        Self {
            store,
            snapshots,
            state: ProductCacheState::default(),
            feed: None,
            snapshot_ttl: Duration::seconds(DEFAULT_SNAPSHOT_TTL_SECS),
            batch_size: MAX_BATCH_IDS,
        }
    }

    /// Override the snapshot freshness window.
    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    /// Override the batch size of `fetch_by_ids`, clamped to `1..=MAX_BATCH_IDS`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_IDS);
        self
    }

    pub fn state(&self) -> &ProductCacheState {
        &self.state
    }

    /// Published products, newest first.
    pub fn products(&self) -> &[Product] {
        self.state.products()
    }

    pub fn is_subscribed(&self) -> bool {
        self.feed.is_some()
    }

    /// Hydrate from a fresh snapshot, then subscribe to the live feed.
    ///
    /// A snapshot younger than the freshness window becomes visible
    /// immediately. The subscription is opened regardless; its first
    /// delivery replaces whatever the snapshot installed.
    pub async fn initialize(&mut self) {
        let now = Utc::now();
        match self.snapshots.load_snapshot().await {
            Ok(Some(snapshot)) if snapshot.is_fresh(now, self.snapshot_ttl) => {
                let count = snapshot.products.len();
                self.state.replace_all(admit_all(snapshot.products));
                self.state.last_synced_at = Some(snapshot.timestamp);
                info!(count, taken_at = %snapshot.timestamp, "catalog hydrated from snapshot");
            }
            Ok(Some(snapshot)) => {
                debug!(taken_at = %snapshot.timestamp, "catalog snapshot expired, ignoring");
            }
            Ok(None) => debug!("no catalog snapshot"),
            Err(err) => warn!(error = %err, "failed to load catalog snapshot"),
        }

        self.state.loading = true;
        self.state.error = None;

        match self.store.subscribe_published() {
            Ok(feed) => {
                self.feed = Some(feed);
                debug!("subscribed to published catalog");
            }
            Err(err) => self.record_sync_failure(err),
        }
    }

    /// Install one feed delivery.
    ///
    /// A collection replaces the state and is persisted; an error is recorded
    /// while the last good state stays visible.
    pub async fn apply_feed_event(&mut self, event: FeedEvent) {
        match event {
            Ok(products) => {
                self.install_collection(products).await;
            }
            Err(err) => self.record_sync_failure(err),
        }
    }

    /// Apply every event already delivered by the feed without waiting.
    ///
    /// Returns the number of events applied.
    pub async fn sync_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(feed) = self.feed.as_mut() else {
                return applied;
            };
            match feed.try_recv() {
                Ok(event) => {
                    self.apply_feed_event(event).await;
                    applied += 1;
                }
                Err(TryRecvError::Empty) => return applied,
                Err(TryRecvError::Disconnected) => {
                    self.feed_closed();
                    return applied;
                }
            }
        }
    }

    /// Wait for the next feed event and apply it.
    ///
    /// Returns `false` when there is no subscription or the feed ended.
    pub async fn wait_for_update(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        match feed.recv().await {
            Some(event) => {
                self.apply_feed_event(event).await;
                true
            }
            None => {
                self.feed_closed();
                false
            }
        }
    }

    /// Drop the live subscription. The cached state stays as it is.
    pub fn unsubscribe(&mut self) {
        if self.feed.take().is_some() {
            debug!("unsubscribed from published catalog");
        }
    }

    /// Synchronous lookup. Never touches the network.
    pub fn get_by_id(&self, id: &str) -> Option<&Product> {
        self.state.get(id)
    }

    /// Cached entry, or a single point read that upserts the result.
    pub async fn fetch_by_id(&mut self, id: &str) -> Result<Product, CatalogError> {
        if let Some(product) = self.state.get(id) {
            return Ok(product.clone());
        }

        let product = match self.store.get_one(id).await {
            Ok(product) => product,
            Err(StoreError::NotFound) => {
                debug!(product_id = %id, "product not found");
                return Err(CatalogError::NotFound(id.to_string()));
            }
            Err(StoreError::Deserialization(reason)) => {
                debug!(product_id = %id, %reason, "point fetch returned an undecodable record");
                return Err(CatalogError::InvalidRecord {
                    id: id.to_string(),
                    reason,
                });
            }
            Err(err) => {
                warn!(product_id = %id, error = %err, "point fetch failed");
                return Err(CatalogError::SyncFailure(err.to_string()));
            }
        };

        let product = admit(product).inspect_err(|err| {
            debug!(product_id = %id, error = %err, "point fetch refused");
        })?;

        self.state.upsert(product.clone());
        self.persist_upserts().await;
        debug!(product_id = %id, "product fetched into cache");
        Ok(product)
    }

    /// Resolve many identifiers, fetching only those not cached yet.
    ///
    /// Missing identifiers are requested in batches of at most the configured
    /// batch size. Identifiers that do not resolve to a published product are
    /// omitted from the result; the result follows the request order with
    /// duplicates removed.
    pub async fn fetch_by_ids<I, T>(&mut self, ids: I) -> Vec<Product>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let requested: Vec<String> = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        let missing: Vec<String> = requested
            .iter()
            .filter(|id| !self.state.contains(id))
            .cloned()
            .collect();

        let mut fetched = 0usize;
        for batch in missing.chunks(self.batch_size) {
            match self.store.get_many(batch).await {
                Ok(found) => {
                    for product in found {
                        if !batch.contains(&product.id) {
                            warn!(product_id = %product.id, "batch returned an unrequested product");
                            continue;
                        }
                        match admit(product) {
                            Ok(product) => {
                                self.state.upsert(product);
                                fetched += 1;
                            }
                            Err(err) => debug!(error = %err, "batch entry refused"),
                        }
                    }
                }
                Err(err) => {
                    warn!(batch = batch.len(), error = %err, "batch fetch failed");
                }
            }
        }

        if fetched > 0 {
            self.persist_upserts().await;
        }
        debug!(
            requested = requested.len(),
            missing = missing.len(),
            fetched,
            "resolved product ids"
        );

        requested
            .iter()
            .filter_map(|id| self.state.get(id).cloned())
            .collect()
    }

    /// Reload the full collection, bypassing any snapshot.
    ///
    /// On failure the error is recorded and returned, and the previous state
    /// stays visible.
    pub async fn refresh(&mut self) -> Result<usize, CatalogError> {
        self.state.loading = true;
        match self.store.query_published().await {
            Ok(products) => Ok(self.install_collection(products).await),
            Err(err) => {
                self.record_sync_failure(err);
                Err(self
                    .state
                    .error
                    .clone()
                    .unwrap_or_else(|| CatalogError::SyncFailure("refresh failed".to_string())))
            }
        }
    }

    async fn install_collection(&mut self, products: Vec<Product>) -> usize {
        let now = Utc::now();
        self.state.replace_all(admit_all(products));
        self.state.loading = false;
        self.state.error = None;
        self.state.last_synced_at = Some(now);

        let count = self.state.products.len();
        info!(count, "catalog synchronized");
        self.persist(now).await;
        count
    }

    fn record_sync_failure(&mut self, err: StoreError) {
        warn!(error = %err, "catalog sync failed, keeping last known state");
        self.state.loading = false;
        self.state.error = Some(CatalogError::SyncFailure(err.to_string()));
    }

    fn feed_closed(&mut self) {
        warn!("published catalog feed closed");
        self.feed = None;
        self.state.loading = false;
    }

    /// Rewrite the snapshot after point fetches, keeping its timestamp.
    ///
    /// Without a completed sync there is no snapshot worth updating.
    async fn persist_upserts(&self) {
        if let Some(taken_at) = self.state.last_synced_at {
            self.persist(taken_at).await;
        }
    }

    async fn persist(&self, timestamp: DateTime<Utc>) {
        let snapshot = CatalogSnapshot {
            timestamp,
            products: self.state.products.clone(),
        };
        if let Err(err) = self.snapshots.save_snapshot(&snapshot).await {
            warn!(error = %err, "failed to persist catalog snapshot");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use malim_types::error::RepositoryError;

    use crate::catalog::store::FeedPublisher;

    pub(crate) fn product(id: &str, date_added: i64, published: bool) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Prenda {id}"),
            category: "vestidos".to_string(),
            public_price: 500.0,
            offer_percentage: 0.0,
            publish_online: published,
            variants: vec![],
            date_added,
            short_details: None,
        }
    }

    #[derive(Default)]
    pub(crate) struct StoreState {
        pub documents: HashMap<String, Product>,
        pub get_one_calls: Vec<String>,
        pub get_many_calls: Vec<Vec<String>>,
        pub query_calls: usize,
        pub publisher: Option<FeedPublisher>,
        pub fail_queries: bool,
        pub fail_subscribe: bool,
        /// Ids whose point read fails to decode.
        pub undecodable: Vec<String>,
    }

    /// In-memory document store that records every remote request.
    #[derive(Clone, Default)]
    pub(crate) struct MockStore {
        pub state: Arc<Mutex<StoreState>>,
    }

    impl MockStore {
        pub fn with_documents(docs: Vec<Product>) -> Self {
            let store = Self::default();
            {
                let mut state = store.state.lock().unwrap();
                for doc in docs {
                    state.documents.insert(doc.id.clone(), doc);
                }
            }
            store
        }

        pub fn publisher(&self) -> FeedPublisher {
            self.state.lock().unwrap().publisher.clone().unwrap()
        }

        pub fn get_many_calls(&self) -> Vec<Vec<String>> {
            self.state.lock().unwrap().get_many_calls.clone()
        }
    }

    impl ProductStore for MockStore {
        async fn query_published(&self) -> Result<Vec<Product>, StoreError> {
            let mut state = self.state.lock().unwrap();
            state.query_calls += 1;
            if state.fail_queries {
                return Err(StoreError::Connection("offline".to_string()));
            }
            Ok(state
                .documents
                .values()
                .filter(|p| p.publish_online)
                .cloned()
                .collect())
        }

        fn subscribe_published(&self) -> Result<ProductFeed, StoreError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_subscribe {
                return Err(StoreError::Connection("listener refused".to_string()));
            }
            let (publisher, feed) = ProductFeed::channel(8);
            state.publisher = Some(publisher);
            Ok(feed)
        }

        async fn get_one(&self, id: &str) -> Result<Product, StoreError> {
            let mut state = self.state.lock().unwrap();
            state.get_one_calls.push(id.to_string());
            if state.fail_queries {
                return Err(StoreError::Connection("offline".to_string()));
            }
            if state.undecodable.iter().any(|u| u == id) {
                return Err(StoreError::Deserialization(format!(
                    "document '{id}': missing field 'name'"
                )));
            }
            state.documents.get(id).cloned().ok_or(StoreError::NotFound)
        }

        async fn get_many(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
            let mut state = self.state.lock().unwrap();
            state.get_many_calls.push(ids.to_vec());
            if state.fail_queries {
                return Err(StoreError::Connection("offline".to_string()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| state.documents.get(id).cloned())
                .collect())
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct MockSnapshots {
        pub saved: Arc<Mutex<Option<CatalogSnapshot>>>,
    }

    impl MockSnapshots {
        pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
            Self {
                saved: Arc::new(Mutex::new(Some(snapshot))),
            }
        }

        pub fn current(&self) -> Option<CatalogSnapshot> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl SnapshotStore for MockSnapshots {
        async fn load_snapshot(&self) -> Result<Option<CatalogSnapshot>, RepositoryError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn save_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<(), RepositoryError> {
            *self.saved.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn cold_start_fills_from_live_feed() {
        let store = MockStore::default();
        let snapshots = MockSnapshots::default();
        let mut cache = ProductCache::new(store.clone(), snapshots.clone());

        cache.initialize().await;
        assert!(cache.products().is_empty());
        assert!(cache.state().is_loading());
        assert!(cache.is_subscribed());

        store
            .publisher()
            .publish(Ok(vec![product("A", 100, true), product("B", 200, true)]))
            .await;
        assert!(cache.wait_for_update().await);

        assert_eq!(ids(cache.products()), vec!["B", "A"]);
        assert!(!cache.state().is_loading());
        assert!(cache.state().last_synced_at().is_some());

        let saved = snapshots.current().unwrap();
        assert_eq!(ids(&saved.products), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn fresh_snapshot_is_visible_before_any_network_response() {
        let snapshot = CatalogSnapshot {
            timestamp: Utc::now() - Duration::minutes(2),
            products: vec![product("X", 50, true)],
        };
        let store = MockStore::default();
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::with_snapshot(snapshot));

        cache.initialize().await;

        assert_eq!(ids(cache.products()), vec!["X"]);
        assert!(cache.get_by_id("X").is_some());
        assert_eq!(store.state.lock().unwrap().query_calls, 0);
        assert!(cache.is_subscribed());
    }

    #[tokio::test]
    async fn expired_snapshot_is_ignored() {
        let snapshot = CatalogSnapshot {
            timestamp: Utc::now() - Duration::minutes(11),
            products: vec![product("X", 50, true)],
        };
        let mut cache = ProductCache::new(MockStore::default(), MockSnapshots::with_snapshot(snapshot));

        cache.initialize().await;
        assert!(cache.products().is_empty());
    }

    #[tokio::test]
    async fn subscription_failure_records_error_and_keeps_snapshot() {
        let snapshot = CatalogSnapshot {
            timestamp: Utc::now(),
            products: vec![product("X", 50, true)],
        };
        let store = MockStore::default();
        store.state.lock().unwrap().fail_subscribe = true;
        let mut cache = ProductCache::new(store, MockSnapshots::with_snapshot(snapshot));

        cache.initialize().await;

        assert!(matches!(cache.state().error(), Some(CatalogError::SyncFailure(_))));
        assert_eq!(ids(cache.products()), vec!["X"]);
        assert!(!cache.is_subscribed());
        assert!(!cache.wait_for_update().await);
    }

    #[tokio::test]
    async fn feed_error_keeps_last_good_state() {
        let store = MockStore::default();
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::default());
        cache.initialize().await;

        let publisher = store.publisher();
        publisher.publish(Ok(vec![product("A", 1, true)])).await;
        publisher
            .publish(Err(StoreError::Connection("socket reset".to_string())))
            .await;
        assert_eq!(cache.sync_pending().await, 2);

        assert_eq!(ids(cache.products()), vec!["A"]);
        assert!(matches!(cache.state().error(), Some(CatalogError::SyncFailure(_))));

        // The next good delivery clears the error.
        publisher.publish(Ok(vec![product("B", 2, true)])).await;
        cache.sync_pending().await;
        assert_eq!(ids(cache.products()), vec!["B"]);
        assert!(cache.state().error().is_none());
    }

    #[tokio::test]
    async fn last_received_snapshot_wins() {
        let store = MockStore::default();
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::default());
        cache.initialize().await;

        let publisher = store.publisher();
        publisher.publish(Ok(vec![product("A", 1, true)])).await;
        publisher
            .publish(Ok(vec![product("B", 1, true), product("C", 3, true)]))
            .await;
        cache.sync_pending().await;

        assert_eq!(ids(cache.products()), vec!["C", "B"]);
        assert!(cache.get_by_id("A").is_none());
    }

    #[tokio::test]
    async fn collection_is_deduplicated_and_filtered() {
        let mut cache = ProductCache::new(MockStore::default(), MockSnapshots::default());
        let mut newer_a = product("A", 300, true);
        newer_a.name = "Blusa nueva".to_string();

        cache
            .apply_feed_event(Ok(vec![
                product("A", 100, true),
                product("B", 200, true),
                product("HIDDEN", 900, false),
                newer_a,
                product("C", 200, true),
            ]))
            .await;

        let state = cache.state();
        assert_eq!(state.len(), 3);
        assert_eq!(ids(state.products()), vec!["A", "B", "C"]);
        assert_eq!(state.get("A").unwrap().name, "Blusa nueva");
        assert!(state.products().iter().all(|p| p.publish_online));
        assert!(
            state
                .products()
                .windows(2)
                .all(|w| w[0].date_added >= w[1].date_added)
        );
    }

    #[tokio::test]
    async fn fetch_by_id_rejects_unpublished() {
        let store = MockStore::with_documents(vec![product("Z", 10, false)]);
        let mut cache = ProductCache::new(store, MockSnapshots::default());

        let err = cache.fetch_by_id("Z").await.unwrap_err();
        assert_eq!(err, CatalogError::NotAvailable("Z".to_string()));
        assert!(cache.get_by_id("Z").is_none());
        assert!(cache.products().is_empty());
    }

    #[tokio::test]
    async fn fetch_by_id_not_found() {
        let mut cache = ProductCache::new(MockStore::default(), MockSnapshots::default());
        let err = cache.fetch_by_id("NOPE").await.unwrap_err();
        assert_eq!(err, CatalogError::NotFound("NOPE".to_string()));
    }

    #[tokio::test]
    async fn fetch_by_id_undecodable_record_is_missing() {
        let store = MockStore::default();
        store.state.lock().unwrap().undecodable.push("Q".to_string());
        let mut cache = ProductCache::new(store, MockSnapshots::default());

        let err = cache.fetch_by_id("Q").await.unwrap_err();
        assert!(matches!(&err, CatalogError::InvalidRecord { id, .. } if id == "Q"));
        assert!(err.is_missing());
        assert!(cache.get_by_id("Q").is_none());
        assert!(cache.state().error().is_none());
    }

    #[tokio::test]
    async fn fetch_by_id_uses_cache_then_upserts() {
        let store = MockStore::with_documents(vec![product("A", 10, true), product("N", 50, true)]);
        let snapshots = MockSnapshots::default();
        let mut cache = ProductCache::new(store.clone(), snapshots.clone());
        cache
            .apply_feed_event(Ok(vec![product("A", 10, true), product("B", 100, true)]))
            .await;

        cache.fetch_by_id("A").await.unwrap();
        assert!(store.state.lock().unwrap().get_one_calls.is_empty());

        let fetched = cache.fetch_by_id("N").await.unwrap();
        assert_eq!(fetched.id, "N");
        assert_eq!(store.state.lock().unwrap().get_one_calls, vec!["N".to_string()]);
        assert_eq!(ids(cache.products()), vec!["B", "N", "A"]);

        let saved = snapshots.current().unwrap();
        assert_eq!(ids(&saved.products), vec!["B", "N", "A"]);
    }

    #[tokio::test]
    async fn fetch_by_ids_requests_only_missing() {
        let store = MockStore::with_documents(vec![product("C", 5, true)]);
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::default());
        cache
            .apply_feed_event(Ok(vec![product("A", 1, true), product("B", 2, true)]))
            .await;

        let resolved = cache.fetch_by_ids(["A", "B", "C", "C"]).await;

        assert_eq!(store.get_many_calls(), vec![vec!["C".to_string()]]);
        assert_eq!(ids(&resolved), vec!["A", "B", "C"]);
        assert!(cache.get_by_id("C").is_some());
    }

    #[tokio::test]
    async fn fetch_by_ids_batches_and_omits_unresolved() {
        let docs: Vec<Product> = (0..23)
            .map(|i| product(&format!("P{i:02}"), i, i != 7))
            .collect();
        let store = MockStore::with_documents(docs);
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::default());

        let mut wanted: Vec<String> = (0..23).map(|i| format!("P{i:02}")).collect();
        wanted.push("GHOST".to_string());
        let resolved = cache.fetch_by_ids(&wanted).await;

        let batch_sizes: Vec<usize> = store.get_many_calls().iter().map(Vec::len).collect();
        assert_eq!(batch_sizes, vec![10, 10, 4]);
        // P07 is unpublished, GHOST does not exist.
        assert_eq!(resolved.len(), 22);
        assert!(resolved.iter().all(|p| p.id != "P07"));
        assert!(cache.get_by_id("P07").is_none());
    }

    #[tokio::test]
    async fn fetch_by_ids_skips_network_when_everything_cached() {
        let store = MockStore::default();
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::default());
        cache
            .apply_feed_event(Ok(vec![product("A", 1, true)]))
            .await;

        let resolved = cache.fetch_by_ids(vec!["A".to_string()]).await;
        assert_eq!(resolved.len(), 1);
        assert!(store.get_many_calls().is_empty());
    }

    #[tokio::test]
    async fn refresh_failure_retains_previous_state() {
        let store = MockStore::with_documents(vec![product("A", 1, true)]);
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::default());

        assert_eq!(cache.refresh().await.unwrap(), 1);
        assert_eq!(ids(cache.products()), vec!["A"]);

        store.state.lock().unwrap().fail_queries = true;
        let err = cache.refresh().await.unwrap_err();
        assert!(matches!(err, CatalogError::SyncFailure(_)));
        assert_eq!(ids(cache.products()), vec!["A"]);
        assert!(!cache.state().is_loading());
    }

    #[tokio::test]
    async fn dropping_cache_unsubscribes() {
        let store = MockStore::default();
        let mut cache = ProductCache::new(store.clone(), MockSnapshots::default());
        cache.initialize().await;
        let publisher = store.publisher();

        drop(cache);
        assert!(publisher.is_closed());
    }

    #[test]
    fn batch_size_is_clamped() {
        let cache = ProductCache::new(MockStore::default(), MockSnapshots::default())
            .with_batch_size(50);
        assert_eq!(cache.batch_size, MAX_BATCH_IDS);
        let cache = ProductCache::new(MockStore::default(), MockSnapshots::default())
            .with_batch_size(0);
        assert_eq!(cache.batch_size, 1);
    }
}
