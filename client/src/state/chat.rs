//! Conversation state and the optimistic send pipeline: insert the user's
//! message immediately, upload any attachment first, then exchange with the
//! chat API and settle the message to `sent` or `error`.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::api::types::{
    ApiError, AttachmentPayload, ChatMessage, MessageMetadata, MessageStatus, PendingFile, Role,
    SendMessageResponse, UploadLimits,
};
use crate::api::ApiClient;
use crate::state::preview::{PreviewGuard, PreviewUrls};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const UPLOAD_ERROR_MESSAGE: &str = "Failed to upload your file. Please try again.";
const DEFAULT_SEND_ERROR_MESSAGE: &str = "Failed to send message. Please try again.";

/// Externally observable conversation state. Owned exclusively by the store;
/// the UI reads snapshots and never mutates it directly.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    pub is_sending: bool,
    pub error: Option<String>,
    pub messages_remaining: Option<i64>,
    pub file_uploading: bool,
}

pub type StateListener = Arc<dyn Fn(&ConversationState) + Send + Sync>;

pub struct ChatStore {
    api: Arc<ApiClient>,
    previews: Arc<dyn PreviewUrls>,
    state: Mutex<ConversationState>,
    listeners: Mutex<Vec<StateListener>>,
    upload_limits: Mutex<Option<UploadLimits>>,
    current_avatar: Mutex<Option<String>>,
}

impl ChatStore {
    pub fn new(api: Arc<ApiClient>, previews: Arc<dyn PreviewUrls>) -> Self {
        Self {
            api,
            previews,
            state: Mutex::new(ConversationState::default()),
            listeners: Mutex::new(Vec::new()),
            upload_limits: Mutex::new(None),
            current_avatar: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> ConversationState {
        self.state.lock().expect("conversation state lock").clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&ConversationState) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .expect("listener lock")
            .push(Arc::new(listener));
    }

    /// Applies a mutation, then notifies subscribers with a snapshot taken
    /// outside the state lock. The listener list is cloned out of its lock
    /// first, so a listener may call back into the store.
    fn update(&self, apply: impl FnOnce(&mut ConversationState)) {
        let snapshot = {
            let mut state = self.state.lock().expect("conversation state lock");
            apply(&mut state);
            state.clone()
        };
        let listeners: Vec<StateListener> = self.listeners.lock().expect("listener lock").clone();
        for listener in &listeners {
            listener(&snapshot);
        }
    }

    pub fn set_current_avatar(&self, avatar_id: &str) {
        *self.current_avatar.lock().expect("avatar lock") = Some(avatar_id.to_string());
    }

    pub fn current_avatar(&self) -> Option<String> {
        self.current_avatar.lock().expect("avatar lock").clone()
    }

    /// Used when switching avatars so stale conversation content never shows.
    pub fn clear_messages(&self) {
        self.update(|state| {
            state.messages.clear();
            state.error = None;
        });
    }

    pub async fn load_history(&self, avatar_id: &str, limit: Option<usize>) {
        self.update(|state| state.is_loading = true);

        let result = self
            .api
            .get_chat_messages(avatar_id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .await;
        match result {
            Ok(messages) => self.update(|state| {
                state.messages = messages;
                state.error = None;
                state.is_loading = false;
            }),
            Err(error) => {
                warn!("failed to load chat history: {}", error);
                self.update(|state| {
                    state.error = Some("Failed to load conversation history.".to_string());
                    state.is_loading = false;
                });
            }
        }
    }

    /// Deletes server-side history, clearing local messages only once the
    /// server has confirmed. The error is propagated so the caller can keep
    /// its confirmation UI open.
    pub async fn delete_history(&self, avatar_id: &str) -> Result<(), ApiError> {
        self.api.delete_chat_history(avatar_id).await?;
        self.clear_messages();
        Ok(())
    }

    /// Inserts a user message in `sending` state before any network I/O.
    /// Returns the new message's id so the caller can settle it later.
    pub fn add_optimistic_message(
        &self,
        content: &str,
        pending: Option<&PendingFile>,
        preview_url: Option<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let message = ChatMessage {
            id: id.clone(),
            role: Role::User,
            content: content.to_string(),
            timestamp: Utc::now(),
            status: MessageStatus::Sending,
            attachment_url: preview_url,
            attachment_type: pending.map(|file| file.category_hint().to_string()),
            attachment_filename: pending.map(|file| file.filename.clone()),
            attachment_storage_path: None,
            metadata: None,
        };
        self.update(|state| state.messages.push(message));
        id
    }

    /// Settles a message's status, leaving everything else untouched.
    pub fn update_message_status(&self, id: &str, status: MessageStatus) {
        self.update(|state| {
            if let Some(message) = state.messages.iter_mut().find(|m| m.id == id) {
                message.status = status;
            }
        });
    }

    /// The send pipeline. Returns whether the exchange succeeded; every
    /// failure is converted into store state, nothing propagates to the UI.
    pub async fn send_message(
        &self,
        content: &str,
        avatar_id: &str,
        relationship_type: Option<&str>,
        pending_file: Option<PendingFile>,
    ) -> bool {
        let content = content.trim();
        if content.is_empty() && pending_file.is_none() {
            return false;
        }

        // Acquire the preview handle for any attachment so its release is
        // guaranteed; only images embed it into the optimistic message.
        let preview = pending_file
            .as_ref()
            .map(|file| PreviewGuard::new(self.previews.clone(), file));
        let preview_url = pending_file
            .as_ref()
            .filter(|file| file.is_image())
            .and_then(|_| preview.as_ref().and_then(|p| p.url()).map(str::to_string));

        let message_id = self.add_optimistic_message(content, pending_file.as_ref(), preview_url);
        self.update(|state| {
            state.is_sending = true;
            state.error = None;
        });

        let mut attachment: Option<AttachmentPayload> = None;
        if let Some(file) = pending_file.as_ref() {
            self.update(|state| state.file_uploading = true);
            let uploaded = self.api.upload_file(file, avatar_id).await;
            self.update(|state| state.file_uploading = false);

            match uploaded {
                Ok(descriptor) => {
                    attachment = Some(AttachmentPayload {
                        url: descriptor.signed_url,
                        file_category: descriptor.file_category,
                        filename: descriptor.filename,
                        storage_path: descriptor.storage_path,
                        extracted_text: descriptor.extracted_text,
                    });
                }
                Err(error) => {
                    // Fail fast: the text send is never attempted, so a
                    // "text sent but file missing" state cannot occur. The
                    // error routes through the same taxonomy as the send
                    // step, so session expiry stays off the chat error
                    // channel here too.
                    self.settle_failure(&message_id, error);
                    return false;
                }
            }
        }

        let result = self
            .api
            .send_chat_message(avatar_id, content, relationship_type, attachment.as_ref())
            .await;

        match result {
            Ok(response) if response.success => {
                self.finalize_success(&message_id, attachment.as_ref(), &response);
                if attachment.is_some() {
                    self.consume_upload_quota();
                }
                true
            }
            Ok(response) => {
                debug!("chat API reported a domain-level send failure");
                self.update(|state| {
                    mark_error(state, &message_id);
                    state.error = Some(
                        response
                            .error
                            .unwrap_or_else(|| DEFAULT_SEND_ERROR_MESSAGE.to_string()),
                    );
                    state.is_sending = false;
                });
                false
            }
            Err(error) => {
                self.settle_failure(&message_id, error);
                false
            }
        }
    }

    fn finalize_success(
        &self,
        message_id: &str,
        attachment: Option<&AttachmentPayload>,
        response: &SendMessageResponse,
    ) {
        let assistant = ChatMessage {
            // The send response carries no assistant message id, so one is
            // generated client-side like every other message.
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: response.avatar_response.clone().unwrap_or_default(),
            timestamp: Utc::now(),
            status: MessageStatus::Sent,
            attachment_url: None,
            attachment_type: None,
            attachment_filename: None,
            attachment_storage_path: None,
            metadata: Some(MessageMetadata {
                model_used: response.model_used.clone(),
                tokens_used: response.tokens_used,
                sentiment: response.sentiment_detected.clone(),
                cost_estimate: response.cost_estimate,
            }),
        };

        self.update(|state| {
            if let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) {
                message.status = MessageStatus::Sent;
                // Rewrite blob-preview values with the server-confirmed
                // attachment descriptor.
                if let Some(attachment) = attachment {
                    message.attachment_url = Some(attachment.url.clone());
                    message.attachment_type = Some(attachment.file_category.clone());
                    message.attachment_filename = Some(attachment.filename.clone());
                    message.attachment_storage_path = Some(attachment.storage_path.clone());
                }
            }
            state.messages.push(assistant);
            if let Some(remaining) = response.messages_remaining {
                state.messages_remaining = Some(remaining);
            }
            state.is_sending = false;
        });
    }

    fn settle_failure(&self, message_id: &str, error: ApiError) {
        warn!("send pipeline failed: {}", error);
        let (message, quota_exhausted) = match &error {
            ApiError::QuotaExceeded { reset_at } => (Some(quota_error_message(*reset_at)), true),
            ApiError::UploadFailed { .. } => (Some(UPLOAD_ERROR_MESSAGE.to_string()), false),
            ApiError::Domain { message } => (Some(message.clone()), false),
            // Session expiry is handled by the refresh protocol and its
            // logout escalation, not the chat error channel.
            ApiError::Unauthorized => (None, false),
            ApiError::Network(_) => (Some(DEFAULT_SEND_ERROR_MESSAGE.to_string()), false),
        };

        self.update(|state| {
            mark_error(state, message_id);
            state.error = message;
            if quota_exhausted {
                // Server is the source of truth, but the UI must reflect the
                // block immediately.
                state.messages_remaining = Some(0);
            }
            state.is_sending = false;
        });
    }

    /// Fetches and caches the daily upload quota. Failures are logged and
    /// swallowed: this only enriches UI messaging.
    pub async fn fetch_upload_limits(&self) {
        match self.api.get_upload_limits().await {
            Ok(limits) => {
                *self.upload_limits.lock().expect("upload limits lock") = Some(limits);
            }
            Err(error) => warn!("failed to fetch upload limits: {}", error),
        }
    }

    pub fn upload_limits(&self) -> Option<UploadLimits> {
        *self.upload_limits.lock().expect("upload limits lock")
    }

    /// Optimistic local decrement after an attachment-bearing send succeeds;
    /// the next fetch reconciles with the server.
    fn consume_upload_quota(&self) {
        let mut cached = self.upload_limits.lock().expect("upload limits lock");
        if let Some(limits) = cached.as_mut() {
            limits.used += 1;
            limits.remaining = (limits.remaining - 1).max(0);
        }
    }
}

fn mark_error(state: &mut ConversationState, message_id: &str) {
    if let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) {
        message.status = MessageStatus::Error;
    }
}

fn quota_error_message(reset_at: Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(
            "Daily message limit reached. Your limit resets at {}.",
            at.format("%H:%M UTC")
        ),
        None => "Daily message limit reached. Please try again tomorrow.".to_string(),
    }
}
