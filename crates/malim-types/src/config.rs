//! Storefront configuration types.
//!
//! `StorefrontConfig` represents the top-level `config.toml` in the data
//! directory. Every section and field has a default so an empty or partial
//! file is valid.

use serde::{Deserialize, Serialize};

use crate::chat::DEFAULT_GREETING;

/// Top-level configuration for the storefront.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub firestore: FirestoreConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Product cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Collection holding the published catalog.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// How long a persisted snapshot may be shown before a sync confirms it.
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,

    /// Maximum identifiers per batched point query.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Interval of the live feed's change detection.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl CatalogConfig {
    /// Snapshot freshness window; values beyond chrono's range saturate.
    pub fn snapshot_ttl(&self) -> chrono::Duration {
        i64::try_from(self.snapshot_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

fn default_collection() -> String {
    "disponible".to_string()
}

fn default_snapshot_ttl_secs() -> u64 {
    600
}

fn default_batch_size() -> usize {
    10
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Remote document store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    #[serde(default)]
    pub project_id: String,

    /// Web API key, appended as `?key=` when present.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_firestore_base_url")]
    pub base_url: String,
}

fn default_firestore_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: None,
            base_url: default_firestore_base_url(),
        }
    }
}

/// Style-assistant backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_endpoint")]
    pub endpoint: String,

    /// Upper bound on product cards resolved per reply.
    #[serde(default = "default_max_product_cards")]
    pub max_product_cards: usize,

    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,

    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_assistant_endpoint() -> String {
    "http://localhost:3000/api/asesor-estilo".to_string()
}

fn default_max_product_cards() -> usize {
    10
}

fn default_reply_timeout_secs() -> u64 {
    60
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: default_assistant_endpoint(),
            max_product_cards: default_max_product_cards(),
            reply_timeout_secs: default_reply_timeout_secs(),
            greeting: default_greeting(),
        }
    }
}

/// Identity provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_identity_base_url")]
    pub identity_base_url: String,

    #[serde(default = "default_token_base_url")]
    pub token_base_url: String,
}

fn default_identity_base_url() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_token_base_url() -> String {
    "https://securetoken.googleapis.com/v1".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            identity_base_url: default_identity_base_url(),
            token_base_url: default_token_base_url(),
        }
    }
}
