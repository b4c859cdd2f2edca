//! Integration test: serve canned /ask responses on a local port and drive
//! QaClient through both response shapes and the failure path.

use lib::qa::{Answer, HistoryEntry, QaClient, QaError, Role, UiLang};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One-shot HTTP server: reads a request, captures its body, answers with
/// the given status and JSON body. Returns (base_url, handle to the captured
/// request body).
async fn canned_server(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let request = loop {
            let n = socket.read(&mut chunk).await.expect("read");
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text
                    .lines()
                    .find_map(|l| l.to_lowercase().strip_prefix("content-length:").map(str::trim).map(String::from))
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break text;
                }
            }
            if n == 0 {
                break text;
            }
        };
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.ok();
        // Hand the request body back for assertions.
        match request.find("\r\n\r\n") {
            Some(i) => request[i + 4..].to_string(),
            None => String::new(),
        }
    });
    (format!("http://127.0.0.1:{}", addr.port()), handle)
}

#[tokio::test]
async fn ask_sends_expected_body_and_parses_cards() {
    let (base, server) = canned_server(
        "200 OK",
        r#"{"message": "<b>MGNREGA</b>", "cards": [{"title": "MGNREGA", "verified": true}]}"#,
    )
    .await;

    let client = QaClient::new(Some(base));
    let history = vec![HistoryEntry {
        role: Role::User,
        content: "earlier question".to_string(),
    }];
    let answer = client
        .ask("What is MGNREGA?", UiLang::En, &history)
        .await
        .expect("ask succeeds");

    match answer {
        Answer::Cards { text, cards } => {
            assert_eq!(text, "<b>MGNREGA</b>");
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].title, "MGNREGA");
            assert_eq!(cards[0].verified, Some(true));
        }
        other => panic!("expected cards, got {:?}", other),
    }

    let request_body = server.await.expect("server task");
    let v: serde_json::Value = serde_json::from_str(&request_body).expect("request is JSON");
    assert_eq!(v["question"], "What is MGNREGA?");
    assert_eq!(v["ui_lang"], "en");
    assert_eq!(v["mode"], "auto");
    assert_eq!(v["history"][0]["role"], "user");
    assert_eq!(v["history"][0]["content"], "earlier question");
}

#[tokio::test]
async fn ask_parses_legacy_sources_shape() {
    let (base, _server) = canned_server(
        "200 OK",
        r#"{"response": "ok", "sources": [{"name_hi": "X"}]}"#,
    )
    .await;

    let client = QaClient::new(Some(base));
    let answer = client.ask("pension?", UiLang::Hi, &[]).await.expect("ask succeeds");
    match answer {
        Answer::Sources { text, sources } => {
            assert_eq!(text, "ok");
            assert_eq!(sources.len(), 1);
            assert_eq!(sources[0].name_hi.as_deref(), Some("X"));
        }
        other => panic!("expected sources, got {:?}", other),
    }
}

#[tokio::test]
async fn non_success_status_is_an_api_error() {
    let (base, _server) = canned_server("500 Internal Server Error", r#"{"detail": "boom"}"#).await;

    let client = QaClient::new(Some(base));
    let err = client
        .ask("pension?", UiLang::Hi, &[])
        .await
        .expect_err("500 must fail");
    match err {
        QaError::Api(msg) => assert!(msg.contains("500"), "unexpected message: {}", msg),
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_request_error() {
    // Nothing listens on this port: bind-then-drop frees it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local_addr").port()
    };
    let client = QaClient::new(Some(format!("http://127.0.0.1:{}", port)));
    let err = client
        .ask("pension?", UiLang::Hi, &[])
        .await
        .expect_err("connection must fail");
    assert!(matches!(err, QaError::Request(_)));
}
