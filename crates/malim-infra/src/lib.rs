//! Infrastructure layer for the Malim storefront.
//!
//! Contains implementations of the port traits defined in `malim-core`:
//! the Firestore REST catalog store with its polling feed, SQLite snapshot
//! and cart persistence, the HTTP style-assistant backend, the identity
//! provider, and the `config.toml` loader.

pub mod assistant;
pub mod config;
pub mod firestore;
pub mod identity;
pub mod sqlite;
