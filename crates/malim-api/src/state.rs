//! Application state wiring the storefront together.
//!
//! The product cache and chat session are generic over their ports; AppState
//! pins them to the concrete infra adapters. Local persistence (database,
//! snapshot, cart) is opened eagerly; remote adapters are built per command
//! so that offline commands work without any remote configuration.

use std::path::PathBuf;

use anyhow::Context;

use malim_core::catalog::ProductCache;
use malim_core::chat::ChatSession;
use malim_infra::assistant::HttpChatBackend;
use malim_infra::config::{load_storefront_config, resolve_data_dir};
use malim_infra::firestore::FirestoreProductStore;
use malim_infra::identity::FirebaseIdentityProvider;
use malim_infra::sqlite::cart::SqliteCartRepository;
use malim_infra::sqlite::pool::{DatabasePool, database_url};
use malim_infra::sqlite::snapshot::SqliteSnapshotStore;
use malim_types::config::StorefrontConfig;

/// Concrete type aliases for the generics pinned to infra implementations.
pub type ConcreteProductCache = ProductCache<FirestoreProductStore, SqliteSnapshotStore>;

pub type ConcreteChatSession = ChatSession<HttpChatBackend, FirebaseIdentityProvider>;

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: StorefrontConfig,
    pub snapshots: SqliteSnapshotStore,
    pub cart_repo: SqliteCartRepository,
}

impl AppState {
    /// Initialize the application state: resolve the data dir, load config,
    /// open the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_storefront_config(&data_dir).await;

        let db_pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("failed to open the local database")?;

        tracing::debug!(data_dir = %data_dir.display(), "application state initialized");

        Ok(Self {
            snapshots: SqliteSnapshotStore::new(db_pool.clone()),
            cart_repo: SqliteCartRepository::new(db_pool.clone()),
            data_dir,
            config,
        })
    }

    /// A product cache over the remote catalog and the local snapshot.
    pub fn product_cache(&self) -> anyhow::Result<ConcreteProductCache> {
        let store = FirestoreProductStore::new(&self.config.firestore, &self.config.catalog)
            .context("catalog store is not configured (set [firestore] in config.toml)")?;

        Ok(ProductCache::new(store, self.snapshots.clone())
            .with_snapshot_ttl(self.config.catalog.snapshot_ttl())
            .with_batch_size(self.config.catalog.batch_size))
    }

    /// A fresh chat session against the configured assistant.
    pub fn chat_session(&self) -> anyhow::Result<ConcreteChatSession> {
        let assistant = &self.config.assistant;
        if assistant.endpoint.trim().is_empty() {
            anyhow::bail!("assistant endpoint is not configured (set [assistant] endpoint in config.toml)");
        }
        let backend = HttpChatBackend::new(assistant).context("failed to build the assistant client")?;
        let identity = FirebaseIdentityProvider::new(&self.config.auth)
            .context("failed to build the identity client")?;

        Ok(ChatSession::new(backend, identity)
            .with_greeting(assistant.greeting.clone())
            .with_max_product_cards(assistant.max_product_cards))
    }
}
