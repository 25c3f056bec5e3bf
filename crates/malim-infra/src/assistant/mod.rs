//! HTTP adapter for the style-assistant backend.

pub mod client;
pub mod types;

pub use client::HttpChatBackend;
