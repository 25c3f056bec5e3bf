//! Business logic and port trait definitions for the Malim storefront.
//!
//! This crate defines the "ports" (store, snapshot, backend, identity and
//! cart traits) that the infrastructure layer implements. It depends only on
//! `malim-types` -- never on `malim-infra` or any network/database crate.

pub mod cart;
pub mod catalog;
pub mod chat;
