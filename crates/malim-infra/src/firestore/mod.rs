//! Firestore REST adapter for the published catalog.

pub mod client;
pub mod feed;
pub mod value;

pub use client::FirestoreProductStore;
