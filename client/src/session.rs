//! Access/refresh token lifecycle. Tracks whether the current credential is
//! usable and coordinates exactly one in-flight refresh regardless of how
//! many concurrent requests discover the credential is stale.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};

use crate::api::auth::{post_refresh, RefreshOutcome};
use crate::api::types::TokenResponse;
use crate::config::{ClientConfig, CredentialMode};
use crate::singleflight::Singleflight;
use crate::storage::{StoredTokens, TokenStore};

/// Proactive refresh kicks in this close to expiry.
const REFRESH_LOOKAHEAD_SECS: i64 = 300;
/// Assumed token lifetime when the backend omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

pub type SessionCallback = Arc<dyn Fn() + Send + Sync>;

struct SessionInner {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    on_logout: Mutex<Vec<SessionCallback>>,
    on_refresh: Mutex<Vec<SessionCallback>>,
    refresh_gate: Singleflight<bool>,
}

pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(http: reqwest::Client, config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                http,
                config,
                store,
                on_logout: Mutex::new(Vec::new()),
                on_refresh: Mutex::new(Vec::new()),
                refresh_gate: Singleflight::new(),
            }),
        }
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.inner.store.load().access_token
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.inner.store.load().refresh_token
    }

    /// In cookie mode the client has no visible token state and defers to the
    /// server for truth, so it always considers itself authenticated.
    pub fn has_tokens(&self) -> bool {
        match self.inner.config.credential_mode {
            CredentialMode::BearerToken => self.inner.store.load().has_tokens(),
            CredentialMode::HttpOnlyCookie => true,
        }
    }

    /// Stores a token pair and computes the absolute expiry. A missing
    /// `refresh_token` keeps the previous one (rotation is optional
    /// server-side).
    pub fn set_tokens(&self, response: &TokenResponse) {
        self.inner.set_tokens(response);
    }

    pub fn is_expired(&self) -> bool {
        is_expired_at(self.inner.store.load().expires_at, Utc::now())
    }

    pub fn should_refresh(&self) -> bool {
        should_refresh_at(self.inner.store.load().expires_at, Utc::now())
    }

    /// Proactive path used by polling/initialization: refreshes only when the
    /// token is inside the look-ahead window. Returns whether the session is
    /// usable afterwards.
    pub async fn ensure_fresh(&self) -> bool {
        match self.inner.config.credential_mode {
            CredentialMode::HttpOnlyCookie => true,
            CredentialMode::BearerToken => {
                if self.should_refresh() {
                    self.refresh().await
                } else {
                    !self.is_expired()
                }
            }
        }
    }

    /// Runs the refresh protocol. Never errors: resolves `true` when a new
    /// credential is in place, `false` otherwise. Concurrent callers share a
    /// single underlying call and are released together.
    pub async fn refresh(&self) -> bool {
        let inner = self.inner.clone();
        self.inner
            .refresh_gate
            .run(move || async move { inner.do_refresh().await })
            .await
    }

    /// Removes all token state and fires logout subscribers unconditionally,
    /// so dependent UI is always reconciled to "logged out".
    pub fn clear_tokens(&self) {
        self.inner.store.clear();
        self.inner.notify_logout();
    }

    /// External hook for collaborators that learn about a server-driven
    /// logout without owning the HTTP call.
    pub fn trigger_logout(&self) {
        self.clear_tokens();
    }

    /// External hook mirroring [`Self::trigger_logout`] for refresh events.
    pub fn trigger_refresh(&self) {
        self.inner.notify_refresh();
    }

    pub fn on_logout(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner
            .on_logout
            .lock()
            .expect("session callback lock")
            .push(Arc::new(callback));
    }

    pub fn on_refresh(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner
            .on_refresh
            .lock()
            .expect("session callback lock")
            .push(Arc::new(callback));
    }
}

impl SessionInner {
    fn set_tokens(&self, response: &TokenResponse) {
        let previous = self.store.load();
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let tokens = StoredTokens {
            access_token: Some(response.access_token.clone()),
            refresh_token: response
                .refresh_token
                .clone()
                .or(previous.refresh_token),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
        };
        self.store.save(&tokens);
    }

    async fn do_refresh(self: Arc<Self>) -> bool {
        match self.config.credential_mode {
            CredentialMode::BearerToken => {
                let Some(refresh_token) = self.store.load().refresh_token else {
                    debug!("refresh skipped: no refresh token present");
                    return false;
                };
                match post_refresh(&self.http, &self.config.base_url, Some(&refresh_token)).await {
                    RefreshOutcome::Success(tokens) => {
                        self.set_tokens(&tokens);
                        info!("access token refreshed");
                        self.notify_refresh();
                        true
                    }
                    RefreshOutcome::Rejected => {
                        warn!("refresh token rejected; logging out");
                        self.store.clear();
                        self.notify_logout();
                        false
                    }
                    // Transient failure: keep tokens so a later attempt can
                    // succeed without forcing the user through login.
                    RefreshOutcome::Transient => false,
                }
            }
            CredentialMode::HttpOnlyCookie => {
                match post_refresh(&self.http, &self.config.base_url, None).await {
                    RefreshOutcome::Success(_) => {
                        info!("session cookie refreshed");
                        self.notify_refresh();
                        true
                    }
                    // With no client-visible state there is nothing to retry
                    // against; the blocked requests are rejected and the UI
                    // returns to login.
                    RefreshOutcome::Rejected | RefreshOutcome::Transient => {
                        self.notify_logout();
                        false
                    }
                }
            }
        }
    }

    // Callbacks run outside the list lock so a subscriber may call back into
    // the session (e.g. a logout handler clearing tokens itself).
    fn notify_logout(&self) {
        let callbacks: Vec<SessionCallback> = self
            .on_logout
            .lock()
            .expect("session callback lock")
            .clone();
        for callback in &callbacks {
            callback();
        }
    }

    fn notify_refresh(&self) {
        let callbacks: Vec<SessionCallback> = self
            .on_refresh
            .lock()
            .expect("session callback lock")
            .clone();
        for callback in &callbacks {
            callback();
        }
    }
}

/// Expired whenever no expiry is recorded (conservative) or the recorded
/// expiry has passed.
fn is_expired_at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(at) => at <= now,
        None => true,
    }
}

/// A refresh is due only inside the `(0, lookahead]` window before expiry,
/// never once the token has already expired.
fn should_refresh_at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(at) => now < at && at - now <= Duration::seconds(REFRESH_LOOKAHEAD_SECS),
        None => false,
    }
}
