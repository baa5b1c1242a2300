//! Integration tests for the chat assist and public snapshot clients,
//! against a local stub server.

mod common;

use common::{StubServer, UNREACHABLE_URL};
use serde_json::{Value, json};
use winelog::{chat::FALLBACK_REPLY, prelude::*, snapshot::UNAVAILABLE_MESSAGE};

fn chat_client(url: &str, api_key: Option<&str>) -> ChatClient {
    let config = ChatConfig::default()
        .url(url)
        .api_key(api_key.map(String::from));
    ChatClient::new(config).expect("chat client")
}

#[tokio::test]
#[test_log::test]
async fn chat_reply_is_appended() {
    let reply = json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": "Try "}, {"text": "roast duck."}]}}]
    });
    let server = StubServer::start(200, reply.to_string()).await;
    let client = chat_client(&server.url("/api/chat"), Some("k123"));
    let mut session = ChatSession::new(12);

    let text = session
        .ask(&client, "What goes with Pinot Noir?")
        .await
        .expect("ask");
    assert_eq!(text, "Try roast duck.");
    assert_eq!(session.state(), ChatState::Idle);
    assert_eq!(
        session.transcript(),
        [
            ChatTurn::user("What goes with Pinot Noir?"),
            ChatTurn::model("Try roast duck.")
        ]
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/api/chat?key=k123");
    let body: Value = serde_json::from_str(&requests[0].body).expect("json body");
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(
        body["contents"][0]["parts"][0]["text"],
        "What goes with Pinot Noir?"
    );
    assert!(body["systemInstruction"]["parts"][0]["text"].is_string());
    assert!(body["generationConfig"]["temperature"].is_number());
}

#[tokio::test]
#[test_log::test]
async fn chat_without_key_sends_no_query() {
    let reply = json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]});
    let server = StubServer::start(200, reply.to_string()).await;
    let client = chat_client(&server.url("/api/chat"), None);
    let mut session = ChatSession::new(12);
    session.ask(&client, "hi").await.expect("ask");
    assert_eq!(server.requests()[0].target, "/api/chat");
}

#[tokio::test]
#[test_log::test]
async fn chat_failures_become_fallback_reply() {
    let error_server = StubServer::start(500, "{\"error\":\"boom\"}").await;
    let empty_server = StubServer::start(200, "{\"candidates\":[]}").await;
    let garbage_server = StubServer::start(200, "<html>").await;

    for url in [
        error_server.url("/api/chat"),
        empty_server.url("/api/chat"),
        garbage_server.url("/api/chat"),
        format!("{UNREACHABLE_URL}/api/chat"),
    ] {
        let client = chat_client(&url, None);
        let mut session = ChatSession::new(12);
        let text = session.ask(&client, "hello").await.expect("never errors");
        assert_eq!(text, FALLBACK_REPLY, "url {url}");
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.state(), ChatState::Idle);
    }
}

#[tokio::test]
#[test_log::test]
async fn generate_reports_status() {
    let server = StubServer::start(403, "denied").await;
    let client = chat_client(&server.url("/api/chat"), None);
    let request = ChatSession::new(12).begin("hi").expect("begin");
    match client.generate(&request).await {
        Err(WinelogError::ApiError { code, message, .. }) => {
            assert_eq!(code, 403);
            assert_eq!(message, "denied");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
#[test_log::test]
async fn public_snapshot_loads_rows() {
    let snapshot = json!([
        {"id": "a", "type": "white", "date": "2024-01-01T10:00:00Z", "name": "Older", "public": true},
        {"id": "b", "type": "red", "date": "2024-02-01T10:00:00Z", "name": "Newer", "public": true,
         "hue": "garnet", "smell_fruit_red": ["cherry"]}
    ]);
    let server = StubServer::start(200, snapshot.to_string()).await;
    let client = PublicSnapshotClient::new(format!("{}/", server.base_url)).expect("client");

    let loaded = client.load().await;
    let PublicSnapshot::Loaded(rows) = &loaded else {
        panic!("expected rows, got {loaded:?}");
    };
    let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Newer", "Older"]);
    assert!(rows[0].meta.starts_with("RED • garnet • cherry • - • -"));
    assert_eq!(loaded.empty_state(), None);
    assert_eq!(server.requests()[0].target, "/public.json");
}

#[tokio::test]
#[test_log::test]
async fn public_snapshot_failures_are_empty_state() {
    let missing = StubServer::start(404, "not found").await;
    let not_array = StubServer::start(200, "{\"entries\":[]}").await;

    for base in [
        missing.base_url.clone(),
        not_array.base_url.clone(),
        UNREACHABLE_URL.to_string(),
    ] {
        let client = PublicSnapshotClient::new(base.as_str()).expect("client");
        let snapshot = client.load().await;
        assert!(
            matches!(snapshot, PublicSnapshot::Unavailable(_)),
            "{base}: {snapshot:?}"
        );
        assert!(snapshot.rows().is_empty());
        assert_eq!(snapshot.empty_state(), Some(UNAVAILABLE_MESSAGE));
    }
}
