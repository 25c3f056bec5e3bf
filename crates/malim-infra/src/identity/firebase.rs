//! FirebaseIdentityProvider -- concrete [`IdentityProvider`] over the
//! Identity Toolkit and Secure Token REST APIs.
//!
//! The web API key is stored as a [`SecretString`] and only exposed when
//! building request URLs. Passwords and tokens are never logged.

use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use malim_core::chat::IdentityProvider;
use malim_types::config::AuthConfig;
use malim_types::error::AuthError;
use malim_types::identity::{AuthSession, UserIdentity};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes meaning "wrong email or password".
const CREDENTIAL_ERRORS: &[&str] = &[
    "INVALID_PASSWORD",
    "EMAIL_NOT_FOUND",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
];

pub struct FirebaseIdentityProvider {
    client: reqwest::Client,
    api_key: SecretString,
    identity_base_url: String,
    token_base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

/// The token endpoint answers in snake_case.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl FirebaseIdentityProvider {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: SecretString::from(config.api_key.clone()),
            identity_base_url: config.identity_base_url.trim_end_matches('/').to_string(),
            token_base_url: config.token_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn expiry(expires_in: Option<&str>) -> Option<chrono::DateTime<Utc>> {
        let secs = expires_in?.parse::<i64>().ok()?;
        Some(Utc::now() + chrono::Duration::seconds(secs))
    }

    async fn error_code(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ErrorEnvelope>().await {
            Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
            _ => format!("HTTP {status}"),
        }
    }
}

impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            self.identity_base_url,
            self.api_key.expose_secret()
        );
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let code = Self::error_code(response).await;
            // Codes may carry a suffix, e.g. "INVALID_PASSWORD : ...".
            if CREDENTIAL_ERRORS.iter().any(|c| code.starts_with(c)) {
                return Err(AuthError::InvalidCredentials);
            }
            return Err(AuthError::Transport(code));
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("invalid sign-in response: {e}")))?;
        tracing::info!(uid = %body.local_id, "signed in");

        Ok(AuthSession {
            user: UserIdentity {
                uid: body.local_id,
                email: body.email,
                display_name: body.display_name.filter(|n| !n.is_empty()),
            },
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: Self::expiry(body.expires_in.as_deref()),
        })
    }

    async fn refresh(&self, session: &AuthSession) -> Result<AuthSession, AuthError> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(AuthError::TokenRefresh("no refresh token".to_string()));
        };
        let url = format!(
            "{}/token?key={}",
            self.token_base_url,
            self.api_key.expose_secret()
        );
        let response = self
            .client
            .post(&url)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::TokenRefresh(Self::error_code(response).await));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenRefresh(format!("invalid refresh response: {e}")))?;
        tracing::debug!(uid = %session.user.uid, "identity token refreshed");

        Ok(AuthSession {
            user: session.user.clone(),
            id_token: body.id_token,
            refresh_token: body.refresh_token.or_else(|| session.refresh_token.clone()),
            expires_at: Self::expiry(body.expires_in.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> FirebaseIdentityProvider {
        FirebaseIdentityProvider::new(&AuthConfig {
            api_key: "web-key".to_string(),
            identity_base_url: server.uri(),
            token_base_url: server.uri(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sign_in_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .and(query_param("key", "web-key"))
            .and(body_partial_json(json!({
                "email": "ana@example.com",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-123",
                "email": "ana@example.com",
                "displayName": "",
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": "3600"
            })))
            .mount(&server)
            .await;

        let session = provider(&server)
            .sign_in("ana@example.com", "secreta")
            .await
            .unwrap();
        assert_eq!(session.user.uid, "uid-123");
        assert!(session.user.display_name.is_none());
        assert_eq!(session.id_token, "id-token");
        assert!(!session.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .sign_in("ana@example.com", "mala")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn refresh_exchanges_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "new-id-token",
                "expires_in": "3600",
                "user_id": "uid-123"
            })))
            .mount(&server)
            .await;

        let old = AuthSession {
            user: UserIdentity {
                uid: "uid-123".to_string(),
                email: None,
                display_name: None,
            },
            id_token: "old".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            expires_at: None,
        };
        let renewed = provider(&server).refresh(&old).await.unwrap();
        assert_eq!(renewed.id_token, "new-id-token");
        assert_eq!(renewed.refresh_token.as_deref(), Some("refresh-token"));
        assert!(renewed.expires_at.is_some());
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails_locally() {
        let server = MockServer::start().await;
        let session = AuthSession {
            user: UserIdentity {
                uid: "u".to_string(),
                email: None,
                display_name: None,
            },
            id_token: "old".to_string(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(matches!(
            provider(&server).refresh(&session).await,
            Err(AuthError::TokenRefresh(_))
        ));
    }

    #[tokio::test]
    async fn revoked_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "TOKEN_EXPIRED" }
            })))
            .mount(&server)
            .await;

        let session = AuthSession {
            user: UserIdentity {
                uid: "u".to_string(),
                email: None,
                display_name: None,
            },
            id_token: "old".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: None,
        };
        assert_eq!(
            provider(&server).refresh(&session).await.unwrap_err(),
            AuthError::TokenRefresh("TOKEN_EXPIRED".to_string())
        );
    }
}
