//! Identity provider adapter.

pub mod firebase;

pub use firebase::FirebaseIdentityProvider;
