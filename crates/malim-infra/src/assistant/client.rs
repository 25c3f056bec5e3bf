//! HttpChatBackend -- concrete [`ChatBackend`] for the style-assistant endpoint.
//!
//! One JSON POST per turn. The identity token travels in the body
//! (`idToken`) and is never logged.

use std::time::Duration;

use malim_core::chat::ChatBackend;
use malim_types::chat::{BackendReply, BackendRequest, ChatMode};
use malim_types::config::AssistantConfig;
use malim_types::error::ChatBackendError;

use super::types::{AssistantRequest, AssistantResponse, HistoryEntry, UserDataBody};

/// Reported when the backend says `success: false` without an error text.
const GENERIC_FAILURE: &str = "Error al procesar el mensaje";

pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatBackend {
    pub fn new(config: &AssistantConfig) -> Result<Self, ChatBackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.reply_timeout_secs.max(1)))
            .build()
            .map_err(|e| ChatBackendError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    fn to_wire<'a>(request: &'a BackendRequest) -> AssistantRequest<'a> {
        AssistantRequest {
            mensaje: &request.message,
            imagen: request.image.as_ref().map(|i| i.data_url.as_str()),
            id_token: request.auth_credential.as_deref(),
            user_data: request.user_profile.as_ref().map(|p| UserDataBody {
                nombre: &p.name,
                whatsapp: &p.whatsapp,
                email: p.email.as_deref(),
            }),
            historial: request
                .transcript
                .iter()
                .map(|e| HistoryEntry {
                    role: e.role.to_string(),
                    content: &e.content,
                })
                .collect(),
        }
    }

    fn from_wire(response: AssistantResponse) -> Result<BackendReply, ChatBackendError> {
        if !response.success {
            let error = response.error.unwrap_or_else(|| GENERIC_FAILURE.to_string());
            if error.contains("Token") {
                return Err(ChatBackendError::TokenExpired);
            }
            return Err(ChatBackendError::Rejected(error));
        }

        let mode = match response.mode.as_deref() {
            None => ChatMode::Discovery,
            Some(raw) => raw.parse::<ChatMode>().unwrap_or_else(|err| {
                tracing::warn!(%err, "unknown assistant mode, treating as discovery");
                ChatMode::Discovery
            }),
        };

        if response.requires_auth || mode == ChatMode::AuthRequired {
            return Ok(BackendReply::AuthRequired {
                message: response.message.or(response.response).unwrap_or_default(),
            });
        }

        Ok(BackendReply::Answer {
            mode,
            response: response.response.or(response.message).unwrap_or_default(),
            extracted_attributes: response.extracted_attributes.map(|attrs| attrs.into_lists()),
            missing_attributes: response
                .missing_attributes
                .map(|missing| missing.into_iter().collect()),
        })
    }
}

impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &BackendRequest) -> Result<BackendReply, ChatBackendError> {
        let body = Self::to_wire(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatBackendError::Transport("request timed out".to_string())
                } else {
                    ChatBackendError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "assistant responded");
        if !status.is_success() {
            return Err(ChatBackendError::Status(status.as_u16()));
        }

        let parsed: AssistantResponse = response
            .json()
            .await
            .map_err(|e| ChatBackendError::Deserialization(e.to_string()))?;
        Self::from_wire(parsed)
    }
}
