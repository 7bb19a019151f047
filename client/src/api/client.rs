use log::{debug, warn};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::api::types::{ApiError, ErrorBody};
use crate::config::{ClientConfig, CredentialMode};
use crate::session::SessionManager;

pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        config: ClientConfig,
        session: Arc<SessionManager>,
    ) -> Self {
        Self {
            http,
            config,
            session,
        }
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.credential_mode {
            CredentialMode::BearerToken => match self.session.get_access_token() {
                Some(token) => builder.bearer_auth(token),
                None => builder,
            },
            // The cookie jar carries credentials implicitly.
            CredentialMode::HttpOnlyCookie => builder,
        }
    }

    /// Sends a request; on 401 it runs the refresh protocol once and retries
    /// the original request. Concurrent 401s coalesce into a single refresh
    /// call inside [`SessionManager::refresh`], and every blocked request is
    /// released together once it settles.
    pub(crate) async fn send_with_refresh<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = self.authorize(build()).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        // A 401 from the refresh or login endpoint must not trigger another
        // refresh attempt.
        if is_auth_endpoint(response.url().path()) {
            return Ok(response);
        }

        debug!("received 401, running token refresh before retry");
        if !self.session.refresh().await {
            warn!("token refresh failed; original request is not retried");
            return Err(ApiError::Unauthorized);
        }

        let retried = self.authorize(build()).send().await?;
        Ok(retried)
    }

    /// Decodes a success body, or maps a non-2xx response into the closed
    /// error taxonomy.
    pub(crate) async fn read_json<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, ApiError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    pub(crate) async fn expect_success(response: Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    pub(crate) async fn error_from_response(response: Response) -> ApiError {
        let status = response.status();
        let body: ErrorBody = response.json().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS
            || body.code.as_deref() == Some("DAILY_LIMIT_REACHED")
        {
            return ApiError::QuotaExceeded {
                reset_at: body.limit_info.and_then(|info| info.reset_at),
            };
        }
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized;
        }
        ApiError::Domain {
            message: body
                .error
                .unwrap_or_else(|| format!("request failed with status {}", status)),
        }
    }
}

pub(crate) fn is_auth_endpoint(path: &str) -> bool {
    path.ends_with("/auth/refresh") || path.ends_with("/auth/login")
}
