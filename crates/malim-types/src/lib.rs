//! Shared domain types for the Malim storefront.
//!
//! Products and the persisted catalog snapshot, the style-assistant
//! transcript and its pending message, cart lines, configuration and the
//! error enums every other crate speaks.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod cart;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
