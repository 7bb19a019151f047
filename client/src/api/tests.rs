use super::*;
use crate::config::ClientConfig;
use crate::session::SessionManager;
use crate::storage::MemoryTokenStore;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn make_client(base_url: &str) -> ApiClient {
    let config = ClientConfig::new(base_url);
    let http = reqwest::Client::new();
    let session = Arc::new(SessionManager::new(
        http.clone(),
        config.clone(),
        Arc::new(MemoryTokenStore::new()),
    ));
    ApiClient::new(http, config, session)
}

fn seed_tokens(client: &ApiClient, access: &str, refresh: &str) {
    client.session().set_tokens(&TokenResponse {
        access_token: access.into(),
        refresh_token: Some(refresh.into()),
        token_type: Some("bearer".into()),
        expires_in: Some(3600),
    });
}

fn user_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "email": "alice@example.com",
        "display_name": "Alice",
        "subscription_tier": "premium"
    })
}

#[tokio::test]
async fn get_me_decodes_the_authenticated_user() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/auth/me")
            .header("authorization", "Bearer a1");
        then.status(200).json_body(user_json("u1"));
    });

    let client = make_client(&server.base_url());
    seed_tokens(&client, "a1", "r1");

    let user = client.get_me().await.unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.display_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn concurrent_401s_share_a_single_refresh() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/auth/me")
            .header("authorization", "Bearer stale");
        then.status(401).json_body(json!({ "error": "expired" }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/auth/me")
            .header("authorization", "Bearer fresh");
        then.status(200).json_body(user_json("u1"));
    });
    // Slow refresh so every blocked request is parked before it resolves.
    let refresh_mock = server.mock(|when, then| {
        when.method(POST).path("/auth/refresh");
        then.status(200)
            .delay(Duration::from_millis(100))
            .json_body(json!({
                "access_token": "fresh",
                "refresh_token": "r2",
                "expires_in": 3600
            }));
    });

    let client = make_client(&server.base_url());
    seed_tokens(&client, "stale", "r1");

    let (a, b, c) = tokio::join!(client.get_me(), client.get_me(), client.get_me());
    assert_eq!(a.unwrap().id, "u1");
    assert_eq!(b.unwrap().id, "u1");
    assert_eq!(c.unwrap().id, "u1");
    refresh_mock.assert_hits(1);
}

#[tokio::test]
async fn rejected_refresh_fails_blocked_requests_and_logs_out() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/auth/me");
        then.status(401).json_body(json!({ "error": "expired" }));
    });
    let refresh_mock = server.mock(|when, then| {
        when.method(POST).path("/auth/refresh");
        then.status(401).json_body(json!({ "error": "invalid refresh token" }));
    });

    let client = make_client(&server.base_url());
    seed_tokens(&client, "stale", "r1");

    let result = client.get_me().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    refresh_mock.assert_hits(1);
    assert!(!client.session().has_tokens());
}

#[tokio::test]
async fn quota_responses_map_to_the_quota_variant() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/chat/send");
        then.status(429).json_body(json!({
            "error": "daily limit reached",
            "code": "DAILY_LIMIT_REACHED",
            "limit_info": { "reset_at": "2026-01-11T00:00:00Z" }
        }));
    });

    let client = make_client(&server.base_url());
    let result = client.send_chat_message("lia", "hi", None, None).await;
    match result {
        Err(ApiError::QuotaExceeded { reset_at }) => assert!(reset_at.is_some()),
        other => panic!("expected quota error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn upload_errors_collapse_into_upload_failed() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/files/upload");
        then.status(500).json_body(json!({ "error": "storage unavailable" }));
    });

    let client = make_client(&server.base_url());
    let file = PendingFile::new("notes.txt", "text/plain", vec![b'x'; 16]);
    let result = client.upload_file(&file, "lia").await;
    match result {
        Err(ApiError::UploadFailed { reason }) => {
            assert!(reason.contains("storage unavailable"), "reason: {reason}")
        }
        other => panic!("expected upload failure, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn upload_decodes_the_attachment_descriptor() {
    let server = MockServer::start_async().await;
    let upload_mock = server.mock(|when, then| {
        when.method(POST).path("/files/upload");
        then.status(200).json_body(json!({
            "signed_url": "https://cdn/abc",
            "file_category": "image",
            "filename": "selfie.png",
            "storage_path": "uploads/u1/abc",
            "extracted_text": null
        }));
    });

    let client = make_client(&server.base_url());
    let file = PendingFile::new("selfie.png", "image/png", vec![0; 32]);
    let uploaded = client.upload_file(&file, "lia").await.unwrap();
    upload_mock.assert();
    assert_eq!(uploaded.signed_url, "https://cdn/abc");
    assert_eq!(uploaded.file_category, "image");
    assert_eq!(uploaded.storage_path, "uploads/u1/abc");
}

#[tokio::test]
async fn domain_errors_carry_the_server_message() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/chat/messages");
        then.status(400).json_body(json!({ "error": "unknown avatar" }));
    });

    let client = make_client(&server.base_url());
    let result = client.get_chat_messages("nope", 20).await;
    match result {
        Err(ApiError::Domain { message }) => assert_eq!(message, "unknown avatar"),
        other => panic!("expected domain error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn error_bodies_that_fail_to_parse_fall_back_to_status_text() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/chat/messages");
        then.status(500).body("<html>oops</html>");
    });

    let client = make_client(&server.base_url());
    let result = client.get_chat_messages("lia", 20).await;
    match result {
        Err(ApiError::Domain { message }) => assert!(message.contains("500"), "{message}"),
        other => panic!("expected domain error, got {:?}", other.map(|_| ())),
    }
}
