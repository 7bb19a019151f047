use crate::api::ApiError;

/// How the client proves its identity to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    /// Tokens are visible to the client and sent as `Authorization: Bearer`.
    /// The token pair lives in the injected [`crate::storage::TokenStore`].
    BearerToken,
    /// Tokens live in httpOnly cookies. The client never sees them; the
    /// cookie jar carries them implicitly and a 401 drives the refresh
    /// protocol.
    HttpOnlyCookie,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub credential_mode: CredentialMode,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential_mode: CredentialMode::BearerToken,
        }
    }

    pub fn with_cookie_credentials(mut self) -> Self {
        self.credential_mode = CredentialMode::HttpOnlyCookie;
        self
    }

    /// Builds the shared HTTP client. Cookie mode enables the cookie jar so
    /// the refresh endpoint can rotate the session cookie transparently.
    pub fn build_http(&self) -> Result<reqwest::Client, ApiError> {
        let builder = reqwest::Client::builder()
            .cookie_store(self.credential_mode == CredentialMode::HttpOnlyCookie);
        Ok(builder.build()?)
    }
}
