//! End-to-end tests: real HTTP deliveries into a running integration.

use std::time::Duration;

use foundry_vtt::{FoundryVtt, IntegrationConfig, MetricValue, WebhookToken};
use tokio::time::timeout;

async fn started(port_range: (u16, u16)) -> FoundryVtt {
    let vtt = FoundryVtt::new(IntegrationConfig::local(port_range)).expect("valid config");
    vtt.start_server().await.expect("server starts");
    vtt
}

#[tokio::test]
async fn test_delivery_updates_metrics_and_publishes_event() {
    let vtt = started((53000, 53100)).await;
    let token = WebhookToken::generate();
    let handle = vtt.setup(token.clone()).await.unwrap();
    let mut events = vtt.payload_events();

    let url = vtt.webhook_url(&token).await.unwrap();
    assert!(url.ends_with(&format!("/api/webhook/{}", token.as_str())));

    let response = reqwest::Client::new()
        .post(&url)
        .header("Content-Type", "application/json")
        .body(r#"{"endpoint":"actor/update","data":{"hp":{"value":12,"max":30},"ac":15}}"#)
        .send()
        .await
        .expect("request sent");
    assert_eq!(response.status(), 200);

    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("event within timeout")
        .expect("bus open");
    assert_eq!(event.payload_received().unwrap().endpoint, "actor/update");

    assert_eq!(handle.current_hp(), MetricValue::from(12));
    assert_eq!(handle.max_hp(), MetricValue::from(30));
    assert_eq!(handle.armor_class(), MetricValue::from(15));

    vtt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bad_bodies_and_unknown_tokens_still_get_200() {
    let vtt = started((53200, 53300)).await;
    let token = WebhookToken::new("table-one");
    let handle = vtt.setup(token.clone()).await.unwrap();
    let mut events = vtt.events_all();
    let client = reqwest::Client::new();

    let garbage = client
        .post(vtt.webhook_url(&token).await.unwrap())
        .body("this is not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), 200);

    let unknown = client
        .post(vtt.webhook_url(&WebhookToken::new("nobody")).await.unwrap())
        .body(r#"{"endpoint":"actor/update","data":{"ac":20}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 200);

    assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());
    assert!(handle.latest_payload().is_none());

    vtt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_subscriptions_created_before_start_are_routed() {
    let vtt = FoundryVtt::new(IntegrationConfig::local((53400, 53500))).unwrap();
    let token = WebhookToken::new("early-bird");
    let handle = vtt.setup(token.clone()).await.unwrap();

    vtt.start_server().await.unwrap();
    let mut events = vtt.payload_events();

    reqwest::Client::new()
        .post(vtt.webhook_url(&token).await.unwrap())
        .body(r#"{"endpoint":"combat/event","data":{"event":"combat_round","round":2}}"#)
        .send()
        .await
        .unwrap();

    timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("event within timeout");
    assert_eq!(handle.combat_status(), MetricValue::from("Round 2"));

    vtt.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_removed_subscription_stops_receiving() {
    let vtt = started((53600, 53700)).await;
    let token = WebhookToken::new("short-lived");
    let handle = vtt.setup(token.clone()).await.unwrap();
    let url = vtt.webhook_url(&token).await.unwrap();
    let mut events = vtt.events_all();

    vtt.remove(handle.id()).await.unwrap();

    let response = reqwest::Client::new()
        .post(&url)
        .body(r#"{"endpoint":"actor/update","data":{"ac":9}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());
    assert!(!handle.is_available());
    assert_eq!(handle.armor_class(), MetricValue::from(0));

    vtt.shutdown().await.unwrap();
}
