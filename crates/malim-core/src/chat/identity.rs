use malim_types::error::AuthError;
use malim_types::identity::AuthSession;

/// Port to the external identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Email/password sign-in.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<AuthSession, AuthError>> + Send;

    /// Exchange the session's refresh token for a new credential.
    fn refresh(
        &self,
        session: &AuthSession,
    ) -> impl std::future::Future<Output = Result<AuthSession, AuthError>> + Send;
}
