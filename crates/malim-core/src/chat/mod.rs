pub mod attachment;
pub mod backend;
pub mod identity;
pub mod resolver;
pub mod session;
pub mod sku;

pub use attachment::AttachmentError;
pub use backend::ChatBackend;
pub use identity::IdentityProvider;
pub use resolver::ProductResolver;
pub use session::{ChatSession, TurnOutcome};
pub use sku::extract_skus;
