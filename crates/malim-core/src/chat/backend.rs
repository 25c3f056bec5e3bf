use malim_types::chat::{BackendReply, BackendRequest};
use malim_types::error::ChatBackendError;

/// Port to the remote style-assistant backend.
///
/// One request per user turn. The reply is either a normal answer or a
/// request to authenticate before continuing.
pub trait ChatBackend: Send + Sync {
    fn send(
        &self,
        request: &BackendRequest,
    ) -> impl std::future::Future<Output = Result<BackendReply, ChatBackendError>> + Send;
}
