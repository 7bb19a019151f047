//! Client core for an AI-companion chat product: session/token lifecycle and
//! the optimistic chat message pipeline.
//!
//! The crate is UI-agnostic. A view layer constructs a [`ClientConfig`], a
//! [`SessionManager`], an [`ApiClient`] and a [`ChatStore`] at its composition
//! root, subscribes to store updates, and renders the resulting
//! [`ConversationState`]. Nothing here renders, routes, or persists beyond
//! the injected [`TokenStore`].

pub mod api;
pub mod config;
pub mod session;
pub mod singleflight;
pub mod state;
pub mod storage;

pub use api::{
    ApiClient, ApiError, ChatMessage, MessageMetadata, MessageStatus, PendingFile, Role,
    TokenResponse, UploadLimits, UserResponse,
};
pub use config::{ClientConfig, CredentialMode};
pub use session::SessionManager;
pub use state::{ChatStore, ConversationState, OpaquePreviewUrls, PreviewUrls};
pub use storage::{MemoryTokenStore, StoredTokens, TokenStore};
