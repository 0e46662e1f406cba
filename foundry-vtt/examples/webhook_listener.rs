//! Listen for Foundry VTT webhooks and print metric updates.
//!
//! ```sh
//! FOUNDRY_VTT_LOG_MODE=development cargo run -p foundry-vtt --example webhook_listener
//! ```
//!
//! Then point the game server's webhook module at the printed URL, or try it
//! by hand:
//!
//! ```sh
//! curl -X POST -d '{"endpoint":"actor/update","data":{"hp":{"value":12,"max":30},"ac":15}}' <url>
//! ```

use foundry_vtt::{logging, FoundryVtt, IntegrationConfig, Metric, WebhookToken};

#[tokio::main]
async fn main() -> foundry_vtt::Result<()> {
    logging::init_logging_from_env()?;

    let vtt = FoundryVtt::new(IntegrationConfig::from_env()?)?;
    let base_url = vtt.start_server().await?;

    let token = std::env::args()
        .nth(1)
        .map(WebhookToken::new)
        .unwrap_or_else(WebhookToken::generate);
    let handle = vtt.setup(token.clone()).await?;

    println!("Callback server: {base_url}");
    println!("Webhook URL:     {}", vtt.webhook_url(&token).await?);
    println!("Press Ctrl+C to stop\n");

    let mut events = vtt.payload_events();
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let endpoint = event
                    .payload_received()
                    .map(|e| e.endpoint)
                    .unwrap_or_default();

                println!("[{}] {endpoint}", event.fired_at.format("%H:%M:%S"));
                let snapshot = handle.snapshot();
                for metric in Metric::ALL {
                    let unit = metric.unit().map(|u| format!(" {u}")).unwrap_or_default();
                    println!("  {:<14} {}{unit}", metric.name(), snapshot.get(metric));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    vtt.shutdown().await
}
