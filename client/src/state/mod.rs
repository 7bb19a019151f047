mod chat;
mod preview;

pub use chat::{ChatStore, ConversationState};
pub use preview::{OpaquePreviewUrls, PreviewUrls};
