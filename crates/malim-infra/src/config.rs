//! Storefront configuration loader and data directory resolution.
//!
//! Reads `config.toml` from the data directory (`~/.malim/` in production)
//! and deserializes it into [`StorefrontConfig`]. Falls back to defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use malim_types::config::StorefrontConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MALIM_DATA_DIR";

/// Resolve the data directory: `MALIM_DATA_DIR`, else `~/.malim`, else `./.malim`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".malim"))
        .unwrap_or_else(|| PathBuf::from(".malim"))
}

/// Load storefront configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`StorefrontConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_storefront_config(data_dir: &Path) -> StorefrontConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return StorefrontConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return StorefrontConfig::default();
        }
    };

    match toml::from_str::<StorefrontConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            StorefrontConfig::default()
        }
    }
}
