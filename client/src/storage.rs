use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Token state as persisted by the embedding application. In a browser shell
/// this maps onto localStorage; the in-process default keeps it in memory for
/// the lifetime of the client.
#[derive(Debug, Clone, Default)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredTokens {
    pub fn has_tokens(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}

/// Persistence seam for the bearer-token credential mode.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> StoredTokens;
    fn save(&self, tokens: &StoredTokens);
    fn clear(&self);
}

/// Default store: tokens live for the process lifetime and are never written
/// to disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> StoredTokens {
        self.inner.lock().expect("token store lock").clone()
    }

    fn save(&self, tokens: &StoredTokens) {
        *self.inner.lock().expect("token store lock") = tokens.clone();
    }

    fn clear(&self) {
        *self.inner.lock().expect("token store lock") = StoredTokens::default();
    }
}
