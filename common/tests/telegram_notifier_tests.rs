// HTTP contract tests for the Telegram notifier
// Feature: poll-detector

use common::config::TelegramConfig;
use common::errors::NotifyError;
use common::telegram::{Notifier, TelegramNotifier};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier(server: &MockServer) -> TelegramNotifier {
    let config = TelegramConfig {
        api_base: server.uri(),
    };
    TelegramNotifier::new(&config, "123:abc", "-1001", 5).unwrap()
}

#[tokio::test]
async fn test_send_message_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "-1001",
            "text": "*hello*",
            "parse_mode": "Markdown"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server).notify("*hello*").await.unwrap();
}

#[tokio::test]
async fn test_ok_false_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    match notifier(&server).notify("x").await {
        Err(NotifyError::Rejected(reason)) => assert!(reason.contains("chat not found")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    assert!(matches!(
        notifier(&server).notify("x").await,
        Err(NotifyError::Status { status: 502, .. })
    ));
}

#[tokio::test]
async fn test_discover_chats_deduplicates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bot123:abc/getUpdates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                { "update_id": 1, "message": { "message_id": 1, "chat": { "id": 77, "type": "private", "username": "ops" } } },
                { "update_id": 2, "message": { "message_id": 2, "chat": { "id": 77, "type": "private", "username": "ops" } } },
                { "update_id": 3, "channel_post": { "message_id": 3, "chat": { "id": -1001, "type": "channel", "title": "Poll Alerts" } } }
            ]
        })))
        .mount(&server)
        .await;

    let chats = notifier(&server).discover_chats().await.unwrap();
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0].id, -1001);
    assert_eq!(chats[0].title.as_deref(), Some("Poll Alerts"));
    assert_eq!(chats[1].id, 77);
    assert_eq!(chats[1].kind, "private");
}
