//! Integration tests for the callback server.
//!
//! These tests start a real HTTP server, send actual HTTP requests,
//! and verify end-to-end functionality.

use std::sync::Arc;
use std::time::Duration;

use callback_server::{CallbackServer, ServerConfig, WebhookPayload};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Test that the callback server can start, receive deliveries, and route them.
#[tokio::test]
async fn test_callback_server_end_to_end() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();

    let server = CallbackServer::start(ServerConfig::loopback((52000, 52100)))
        .await
        .expect("Failed to start callback server");

    let token = "test-token-123".to_string();
    server.router().register(token.clone(), Arc::new(tx)).await;

    let client = reqwest::Client::new();
    let url = server.webhook_url(&token).unwrap();

    // Valid JSON delivery
    let body = r#"{"endpoint":"actor/update","data":{"hp":{"value":12,"max":30},"ac":15}}"#;
    let response = client
        .post(url.clone())
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to send HTTP request");

    assert_eq!(response.status(), 200);

    let delivery = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for delivery")
        .expect("No delivery received");

    assert_eq!(delivery.token, token);
    assert_eq!(delivery.body.as_ref(), body.as_bytes());

    // Garbage body is still acknowledged and still routed untouched
    let response = client
        .post(url)
        .body("not json at all")
        .send()
        .await
        .expect("Failed to send second HTTP request");

    assert_eq!(response.status(), 200);

    let delivery = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for second delivery")
        .expect("No second delivery received");
    assert_eq!(delivery.body.as_ref(), b"not json at all");

    server.shutdown().await.expect("Failed to shutdown server");
}

/// Unknown tokens are acknowledged with 200 but never reach a handler.
#[tokio::test]
async fn test_unknown_token_is_acknowledged_and_dropped() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
    let server = CallbackServer::start(ServerConfig::loopback((52200, 52300)))
        .await
        .expect("Failed to start callback server");

    server.router().register("known".to_string(), Arc::new(tx)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(server.webhook_url("unknown").unwrap())
        .body("{}")
        .send()
        .await
        .expect("Failed to send HTTP request");

    assert_eq!(response.status(), 200);

    let nothing = timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(nothing.is_err(), "Should not receive delivery for unknown token");

    server.shutdown().await.expect("Failed to shutdown server");
}

/// Test multiple tokens and concurrent deliveries.
#[tokio::test]
async fn test_multiple_tokens_concurrent_deliveries() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
    let server = CallbackServer::start(ServerConfig::loopback((52400, 52500)))
        .await
        .expect("Failed to start callback server");

    let tokens = ["token-1", "token-2", "token-3"];
    for token in tokens {
        server
            .router()
            .register(token.to_string(), Arc::new(tx.clone()))
            .await;
    }

    let client = reqwest::Client::new();
    let mut handles = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let client = client.clone();
        let url = server.webhook_url(token).unwrap();
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .body(format!(r#"{{"endpoint":"test","data":{{"n":{i}}}}}"#))
                .send()
                .await
        }));
    }

    for handle in handles {
        let response = handle.await.expect("Task failed").expect("HTTP request failed");
        assert_eq!(response.status(), 200);
    }

    let mut received = Vec::new();
    for _ in 0..tokens.len() {
        let delivery = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Timeout waiting for delivery")
            .expect("No delivery received");
        received.push(delivery);
    }

    let mut received_tokens: Vec<String> = received.iter().map(|d| d.token.clone()).collect();
    received_tokens.sort();
    assert_eq!(received_tokens, vec!["token-1", "token-2", "token-3"]);

    for delivery in received {
        let body = String::from_utf8(delivery.body.to_vec()).unwrap();
        match delivery.token.as_str() {
            "token-1" => assert!(body.contains(r#""n":0"#)),
            "token-2" => assert!(body.contains(r#""n":1"#)),
            "token-3" => assert!(body.contains(r#""n":2"#)),
            other => panic!("Unexpected token: {other}"),
        }
    }

    server.shutdown().await.expect("Failed to shutdown server");
}

/// Test token registration and unregistration during server operation.
#[tokio::test]
async fn test_dynamic_token_management() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
    let server = CallbackServer::start(ServerConfig::loopback((52600, 52700)))
        .await
        .expect("Failed to start callback server");

    let client = reqwest::Client::new();
    let token = "dynamic-token".to_string();
    let url = server.webhook_url(&token).unwrap();

    // Not registered yet: acknowledged, dropped
    let response = client.post(url.clone()).body("before").send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());

    server.router().register(token.clone(), Arc::new(tx)).await;

    let response = client.post(url.clone()).body("during").send().await.unwrap();
    assert_eq!(response.status(), 200);
    let delivery = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for delivery")
        .expect("No delivery received");
    assert_eq!(delivery.body.as_ref(), b"during");

    assert!(server.router().unregister(&token).await);

    let response = client.post(url).body("after").send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());

    server.shutdown().await.expect("Failed to shutdown server");
}

/// Non-webhook paths get 404; oversize deliveries are acknowledged but never routed.
#[tokio::test]
async fn test_non_webhook_requests() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
    let config = ServerConfig {
        max_body_bytes: 16,
        ..ServerConfig::loopback((52800, 52900))
    };
    let server = CallbackServer::start(config)
        .await
        .expect("Failed to start callback server");
    server.router().register("tok".to_string(), Arc::new(tx)).await;
    let base_url = server.base_url().to_string();
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "ok");

    let missing_token = client
        .post(format!("{base_url}/api/webhook/"))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(missing_token.status(), 404);

    let too_large = client
        .post(server.webhook_url("tok").unwrap())
        .body("x".repeat(64))
        .send()
        .await
        .unwrap();
    assert_eq!(too_large.status(), 200);
    assert!(
        timeout(Duration::from_millis(100), rx.recv()).await.is_err(),
        "oversize body must not be routed"
    );

    // A body at the limit still goes through
    let at_limit = client
        .post(server.webhook_url("tok").unwrap())
        .body("y".repeat(16))
        .send()
        .await
        .unwrap();
    assert_eq!(at_limit.status(), 200);
    let delivery = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for delivery")
        .expect("No delivery received");
    assert_eq!(delivery.body.len(), 16);

    server.shutdown().await.expect("Failed to shutdown server");
}

/// Deliveries without a Content-Length header (chunked) are read and routed.
#[tokio::test]
async fn test_chunked_delivery_is_routed() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
    let server = CallbackServer::start(ServerConfig::loopback((53800, 53900)))
        .await
        .expect("Failed to start callback server");
    server
        .router()
        .register("chunky".to_string(), Arc::new(tx))
        .await;

    let first = r#"{"endpoint":"combat/update","#;
    let second = r#""data":{"round":3}}"#;
    let request = format!(
        "POST /api/webhook/chunky HTTP/1.1\r\n\
         Host: 127.0.0.1\r\n\
         Content-Type: application/json\r\n\
         Transfer-Encoding: chunked\r\n\
         Connection: close\r\n\
         \r\n\
         {:x}\r\n{first}\r\n{:x}\r\n{second}\r\n0\r\n\r\n",
        first.len(),
        second.len(),
    );

    let mut stream = TcpStream::connect(("127.0.0.1", server.port()))
        .await
        .expect("Failed to connect");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    timeout(Duration::from_secs(2), stream.read_to_end(&mut response))
        .await
        .expect("Timeout reading response")
        .unwrap();
    let response = String::from_utf8_lossy(&response);
    assert!(
        response.starts_with("HTTP/1.1 200"),
        "unexpected response: {response}"
    );

    let delivery = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for delivery")
        .expect("No delivery received");
    assert_eq!(delivery.token, "chunky");
    assert_eq!(delivery.body.as_ref(), format!("{first}{second}").as_bytes());

    server.shutdown().await.expect("Failed to shutdown server");
}
