use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the access token expires. Defaults to one hour when the
    /// backend omits it.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub subscription_tier: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sending,
    Sent,
    Error,
}

fn default_status() -> MessageStatus {
    // History fetched from the server only contains settled messages.
    MessageStatus::Sent
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MessageMetadata {
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<i64>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub cost_estimate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_status")]
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Server-confirmed attachment fields sent alongside a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPayload {
    pub url: String,
    pub file_category: String,
    pub filename: String,
    pub storage_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub avatar_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    #[serde(default)]
    pub avatar_response: Option<String>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<i64>,
    #[serde(default)]
    pub sentiment_detected: Option<String>,
    #[serde(default)]
    pub emotional_depth: Option<f64>,
    #[serde(default)]
    pub cost_estimate: Option<f64>,
    #[serde(default)]
    pub messages_remaining: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub signed_url: String,
    pub file_category: String,
    pub filename: String,
    pub storage_path: String,
    #[serde(default)]
    pub extracted_text: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UploadLimits {
    pub used: i64,
    pub remaining: i64,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub reset_at: Option<DateTime<Utc>>,
}

/// Error body shape the backend returns on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub limit_info: Option<LimitInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitInfo {
    #[serde(default)]
    pub reset_at: Option<DateTime<Utc>>,
}

/// A file the user picked but has not sent yet.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// Coarse category shown in the UI before the upload service has
    /// classified the file.
    pub fn category_hint(&self) -> &'static str {
        if self.is_image() {
            "image"
        } else if self.content_type.starts_with("audio/") {
            "audio"
        } else {
            "document"
        }
    }
}

/// Closed failure taxonomy produced at the HTTP boundary. The chat store
/// handles these with an exhaustive match instead of probing ad hoc fields
/// on a dynamic error object.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("daily message limit reached")]
    QuotaExceeded { reset_at: Option<DateTime<Utc>> },

    #[error("file upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("{message}")]
    Domain { message: String },

    #[error("session expired")]
    Unauthorized,

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}
