use log::{debug, warn};
use serde_json::json;

use super::{
    client::ApiClient,
    types::{ApiError, TokenResponse, UserResponse},
};

/// Result of one call to the refresh endpoint. Only an explicit server-side
/// rejection logs the user out; transport failures are treated as transient.
#[derive(Debug)]
pub(crate) enum RefreshOutcome {
    Success(TokenResponse),
    Rejected,
    Transient,
}

pub(crate) async fn post_refresh(
    http: &reqwest::Client,
    base_url: &str,
    refresh_token: Option<&str>,
) -> RefreshOutcome {
    // Cookie mode sends an empty body; the cookie jar carries the credential.
    let body = match refresh_token {
        Some(token) => json!({ "refresh_token": token }),
        None => json!({}),
    };

    let response = match http
        .post(format!("{}/auth/refresh", base_url))
        .json(&body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(error) => {
            warn!("refresh request failed to reach the server: {}", error);
            return RefreshOutcome::Transient;
        }
    };

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        debug!("refresh token rejected by the server");
        return RefreshOutcome::Rejected;
    }
    if !status.is_success() {
        warn!("refresh endpoint returned status {}", status);
        return RefreshOutcome::Transient;
    }

    match response.json::<TokenResponse>().await {
        Ok(tokens) => RefreshOutcome::Success(tokens),
        Err(error) => {
            warn!("failed to parse refresh response: {}", error);
            RefreshOutcome::Transient
        }
    }
}

impl ApiClient {
    /// Fetches the authenticated user. Used by initialization paths to decide
    /// whether a session exists at all.
    pub async fn get_me(&self) -> Result<UserResponse, ApiError> {
        let response = self
            .send_with_refresh(|| {
                self.http_client()
                    .get(format!("{}/auth/me", self.base_url()))
            })
            .await?;
        Self::read_json(response).await
    }
}
