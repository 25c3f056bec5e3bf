//! Style-assistant conversation types.
//!
//! Models the transcript, the conversation phase reported by the backend,
//! the single pending message held across the authentication step, and the
//! request/reply envelopes exchanged with the assistant backend.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::ProductCard;

/// Greeting seeded as the first assistant message of every conversation.
pub const DEFAULT_GREETING: &str = "¡Hola! 💝 Soy Mia, tu asesora de estilo personal de Malim. \
Estoy aquí para ayudarte a encontrar el outfit perfecto. ¿En qué puedo ayudarte hoy?";

/// Transcript text shown for a message that carries only an image.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "📷 Imagen adjunta";

/// Text sent to the backend for a message that carries only an image.
pub const IMAGE_ONLY_PROMPT: &str = "Analiza esta imagen";

/// Attribute names the assistant must collect before recommending.
pub const ATTR_CATEGORY: &str = "category";
pub const ATTR_SIZE: &str = "size";
pub const ATTR_COLOR: &str = "color";

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Conversation phase.
///
/// `Discovery` gathers shopper intent, `Recommendation` presents matching
/// products, `AuthRequired` marks the assistant's request to sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    Discovery,
    Recommendation,
    AuthRequired,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Discovery => write!(f, "discovery"),
            ChatMode::Recommendation => write!(f, "recommendation"),
            ChatMode::AuthRequired => write!(f, "auth_required"),
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discovery" => Ok(ChatMode::Discovery),
            "recommendation" => Ok(ChatMode::Recommendation),
            "auth_required" => Ok(ChatMode::AuthRequired),
            other => Err(format!("invalid chat mode: '{other}'")),
        }
    }
}

impl Default for ChatMode {
    fn default() -> Self {
        ChatMode::Discovery
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub mode: Option<ChatMode>,
    /// Whether the user attached an image to this message.
    #[serde(default)]
    pub has_image: bool,
    /// Products resolved from SKUs mentioned in a recommendation reply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductCard>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>, mode: Option<ChatMode>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            mode,
            has_image: false,
            products: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>, has_image: bool) -> Self {
        Self {
            has_image,
            ..Self::new(MessageRole::User, content, None)
        }
    }

    pub fn assistant(content: impl Into<String>, mode: Option<ChatMode>) -> Self {
        Self::new(MessageRole::Assistant, content, mode)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content, None)
    }
}

/// An image attached to a user message, carried as a `data:` URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub data_url: String,
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("bytes", &self.data_url.len())
            .finish()
    }
}

/// A user message held back because it triggered the authentication step.
///
/// At most one exists per session; a newer unauthenticated message replaces
/// an older one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    /// Transcript entry appended when the message was first submitted.
    pub message_id: Uuid,
    pub text: String,
    pub image: Option<ImageAttachment>,
}

/// What the backend has learned about the shopper so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub mode: ChatMode,
    pub extracted_attributes: BTreeMap<String, Vec<String>>,
    pub missing_attributes: BTreeSet<String>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            mode: ChatMode::Discovery,
            extracted_attributes: BTreeMap::new(),
            missing_attributes: [ATTR_CATEGORY, ATTR_SIZE, ATTR_COLOR]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Contact details the shopper shares once signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub whatsapp: String,
    pub email: Option<String>,
}

/// Role/content pair of the transcript as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: MessageRole,
    pub content: String,
}

/// A request to the assistant backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub message: String,
    pub image: Option<ImageAttachment>,
    pub transcript: Vec<TranscriptEntry>,
    /// Identity token, present once the shopper has authenticated.
    pub auth_credential: Option<String>,
    pub user_profile: Option<UserProfile>,
}

/// A successful reply from the assistant backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    Answer {
        mode: ChatMode,
        response: String,
        extracted_attributes: Option<BTreeMap<String, Vec<String>>>,
        missing_attributes: Option<BTreeSet<String>>,
    },
    /// The backend wants the shopper to sign in before continuing.
    AuthRequired { message: String },
}
