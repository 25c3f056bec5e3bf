//! Style-assistant conversation engine.
//!
//! A `ChatSession` owns one shopper's transcript, the conversation phase the
//! backend reports, and the single message held back while the shopper signs
//! in. Each turn runs to completion under `&mut self`, which is what keeps a
//! second submission from overlapping a reply that is still in flight.
//!
//! Auth gate: the first `auth_required` reply of a session stores the
//! outbound message as pending and appends one prompt. Repeated signals only
//! replace the pending message. Completing authentication takes the pending
//! message out of the session and then sends it, so it goes out once.

use tracing::{debug, info, warn};

use malim_types::catalog::ProductCard;
use malim_types::chat::{
    BackendReply, BackendRequest, ChatMessage, ChatMode, ConversationState, DEFAULT_GREETING,
    IMAGE_ONLY_PLACEHOLDER, IMAGE_ONLY_PROMPT, ImageAttachment, MessageRole, PendingMessage,
    TranscriptEntry, UserProfile,
};
use malim_types::error::{AuthError, ChatBackendError};
use malim_types::identity::AuthSession;

use super::attachment::{self, AttachmentError};
use super::backend::ChatBackend;
use super::identity::IdentityProvider;
use super::resolver::ProductResolver;
use super::sku::extract_skus;

/// Upper bound on SKUs resolved per recommendation reply.
pub const DEFAULT_MAX_PRODUCT_CARDS: usize = 10;

/// Shown when the backend asks for authentication without saying why.
pub const AUTH_PROMPT_FALLBACK: &str =
    "Para mostrarte productos y guardar tus preferencias necesito que inicies sesión. 💝";

/// What happened to a submitted (or replayed) message.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Nothing to send: no text and no image.
    Ignored,
    Answered { mode: ChatMode, products: usize },
    /// The message is pending and the shopper was asked to sign in.
    AuthRequired,
    /// The message replaced the pending one; the prompt is already showing.
    AuthAlreadyRequested,
    /// The backend call failed; a system message describes the failure.
    Failed(ChatBackendError),
}

pub struct ChatSession<B, I> {
    backend: B,
    identity: I,
    greeting: String,
    max_product_cards: usize,
    messages: Vec<ChatMessage>,
    conversation: ConversationState,
    pending: Option<PendingMessage>,
    /// One-shot: set by the first auth request, cleared by authentication,
    /// a new conversation or logout.
    auth_requested: bool,
    auth_prompt_visible: bool,
    auth: Option<AuthSession>,
    profile: Option<UserProfile>,
}

impl<B, I> ChatSession<B, I>
where
    B: ChatBackend,
    I: IdentityProvider,
{
    pub fn new(backend: B, identity: I) -> Self {
        let greeting = DEFAULT_GREETING.to_string();
        Self {
            backend,
            identity,
            messages: vec![ChatMessage::assistant(greeting.clone(), None)],
            greeting,
            max_product_cards: DEFAULT_MAX_PRODUCT_CARDS,
            conversation: ConversationState::default(),
            pending: None,
            auth_requested: false,
            auth_prompt_visible: false,
            auth: None,
            profile: None,
        }
    }

    /// Replace the greeting and reseed the transcript with it.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self.reset_transcript();
        self
    }

    pub fn with_max_product_cards(mut self, max: usize) -> Self {
        self.max_product_cards = max;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn pending(&self) -> Option<&PendingMessage> {
        self.pending.as_ref()
    }

    pub fn auth_requested(&self) -> bool {
        self.auth_requested
    }

    /// Whether the caller should be presenting the sign-in step.
    pub fn auth_prompt_visible(&self) -> bool {
        self.auth_prompt_visible
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn auth(&self) -> Option<&AuthSession> {
        self.auth.as_ref()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Contact details sent along with authenticated requests.
    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
    }

    /// Submit a user turn.
    ///
    /// The transcript entry is appended here, once. Backend failures are
    /// reported in the transcript and in the returned outcome; only an
    /// invalid attachment is an error, and it leaves the session untouched.
    pub async fn submit<R: ProductResolver>(
        &mut self,
        text: &str,
        image: Option<ImageAttachment>,
        catalog: &mut R,
    ) -> Result<TurnOutcome, AttachmentError> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Ok(TurnOutcome::Ignored);
        }
        if let Some(image) = &image {
            attachment::parse_data_url(&image.data_url)?;
        }

        let shown = if text.is_empty() { IMAGE_ONLY_PLACEHOLDER } else { text };
        let entry = ChatMessage::user(shown, image.is_some());
        let outbound = PendingMessage {
            message_id: entry.id,
            text: text.to_string(),
            image,
        };
        self.messages.push(entry);

        Ok(self.dispatch(outbound, catalog).await)
    }

    /// Sign in through the identity provider and replay any pending message.
    ///
    /// On failure the prompt stays up and the pending message is kept.
    pub async fn sign_in<R: ProductResolver>(
        &mut self,
        email: &str,
        password: &str,
        catalog: &mut R,
    ) -> Result<Option<TurnOutcome>, AuthError> {
        match self.identity.sign_in(email, password).await {
            Ok(auth) => Ok(self.complete_authentication(auth, catalog).await),
            Err(err) => {
                self.authentication_failed(&err);
                Err(err)
            }
        }
    }

    /// Install a credential obtained elsewhere and replay the pending message.
    ///
    /// Returns the outcome of the replay, or `None` when nothing was pending.
    pub async fn complete_authentication<R: ProductResolver>(
        &mut self,
        auth: AuthSession,
        catalog: &mut R,
    ) -> Option<TurnOutcome> {
        info!(uid = %auth.user.uid, "shopper authenticated");
        self.auth = Some(auth);
        self.auth_requested = false;
        self.auth_prompt_visible = false;

        let pending = self.pending.take()?;
        info!("replaying pending message");
        Some(self.dispatch(pending, catalog).await)
    }

    pub fn authentication_failed(&mut self, err: &AuthError) {
        warn!(error = %err, "authentication failed");
        if self.auth_requested {
            self.auth_prompt_visible = true;
        }
    }

    /// Hide the sign-in step without giving up the pending message.
    pub fn dismiss_auth_prompt(&mut self) {
        self.auth_prompt_visible = false;
    }

    /// Start over: greeting only, initial conversation state, nothing pending.
    pub fn new_conversation(&mut self) {
        self.reset_transcript();
        self.conversation = ConversationState::default();
        self.pending = None;
        self.auth_requested = false;
        self.auth_prompt_visible = false;
        debug!("conversation reset");
    }

    /// Forget the credential and profile, then start over.
    pub fn logout(&mut self) {
        self.auth = None;
        self.profile = None;
        self.new_conversation();
        info!("shopper logged out");
    }

    fn reset_transcript(&mut self) {
        self.messages = vec![ChatMessage::assistant(self.greeting.clone(), None)];
    }

    async fn dispatch<R: ProductResolver>(
        &mut self,
        outbound: PendingMessage,
        catalog: &mut R,
    ) -> TurnOutcome {
        let request = self.build_request(&outbound);
        debug!(
            authenticated = request.auth_credential.is_some(),
            has_image = request.image.is_some(),
            history = request.transcript.len(),
            "sending message to assistant"
        );

        match self.send_with_refresh(request).await {
            Ok(BackendReply::AuthRequired { message }) => {
                self.request_authentication(outbound, message)
            }
            Ok(BackendReply::Answer {
                mode: ChatMode::AuthRequired,
                response,
                ..
            }) => self.request_authentication(outbound, response),
            Ok(BackendReply::Answer {
                mode,
                response,
                extracted_attributes,
                missing_attributes,
            }) => {
                self.conversation.mode = mode;
                if let Some(extracted) = extracted_attributes {
                    self.conversation.extracted_attributes = extracted;
                }
                if let Some(missing) = missing_attributes {
                    self.conversation.missing_attributes = missing;
                }

                let mut message = ChatMessage::assistant(response, Some(mode));
                if mode == ChatMode::Recommendation {
                    message.products = self.resolve_cards(&message.content, catalog).await;
                }
                let products = message.products.len();
                self.messages.push(message);
                TurnOutcome::Answered { mode, products }
            }
            Err(err) => {
                warn!(error = %err, "assistant request failed");
                self.messages.push(ChatMessage::system(format!(
                    "⚠️ Ocurrió un error: {err}. Por favor intenta de nuevo."
                )));
                TurnOutcome::Failed(err)
            }
        }
    }

    /// Send once; on an expired credential refresh it and send once more.
    async fn send_with_refresh(
        &mut self,
        mut request: BackendRequest,
    ) -> Result<BackendReply, ChatBackendError> {
        match self.backend.send(&request).await {
            Err(ChatBackendError::TokenExpired) => {
                let Some(current) = self.auth.clone() else {
                    return Err(ChatBackendError::TokenExpired);
                };
                match self.identity.refresh(&current).await {
                    Ok(renewed) => {
                        info!("credential refreshed, retrying");
                        request.auth_credential = Some(renewed.id_token.clone());
                        self.auth = Some(renewed);
                        self.backend.send(&request).await
                    }
                    Err(err) => {
                        warn!(error = %err, "credential refresh failed");
                        Err(ChatBackendError::TokenExpired)
                    }
                }
            }
            other => other,
        }
    }

    fn request_authentication(&mut self, outbound: PendingMessage, message: String) -> TurnOutcome {
        self.pending = Some(outbound);
        if self.auth_requested {
            debug!("authentication already requested, pending message replaced");
            return TurnOutcome::AuthAlreadyRequested;
        }

        self.auth_requested = true;
        self.auth_prompt_visible = true;
        self.conversation.mode = ChatMode::AuthRequired;
        let content = if message.trim().is_empty() {
            AUTH_PROMPT_FALLBACK.to_string()
        } else {
            message
        };
        self.messages
            .push(ChatMessage::assistant(content, Some(ChatMode::AuthRequired)));
        info!("authentication requested, message held until sign-in");
        TurnOutcome::AuthRequired
    }

    fn build_request(&self, outbound: &PendingMessage) -> BackendRequest {
        let message = if outbound.text.is_empty() {
            IMAGE_ONLY_PROMPT.to_string()
        } else {
            outbound.text.clone()
        };
        BackendRequest {
            message,
            image: outbound.image.clone(),
            transcript: self.history_before(outbound),
            auth_credential: self.auth.as_ref().map(|a| a.id_token.clone()),
            user_profile: self.auth.as_ref().and(self.profile.clone()),
        }
    }

    /// Conversation preceding the outbound message, without system notices
    /// or sign-in prompts.
    fn history_before(&self, outbound: &PendingMessage) -> Vec<TranscriptEntry> {
        let end = self
            .messages
            .iter()
            .position(|m| m.id == outbound.message_id)
            .unwrap_or(self.messages.len());
        self.messages[..end]
            .iter()
            .filter(|m| m.role != MessageRole::System && m.mode != Some(ChatMode::AuthRequired))
            .map(|m| TranscriptEntry {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    async fn resolve_cards<R: ProductResolver>(&self, reply: &str, catalog: &mut R) -> Vec<ProductCard> {
        let mut skus = extract_skus(reply);
        skus.truncate(self.max_product_cards);
        if skus.is_empty() {
            return Vec::new();
        }
        let cards: Vec<ProductCard> = catalog
            .resolve_published(&skus)
            .await
            .iter()
            .filter(|p| p.is_published())
            .map(ProductCard::from)
            .collect();
        debug!(mentioned = skus.len(), resolved = cards.len(), "attached product cards");
        cards
    }
}
