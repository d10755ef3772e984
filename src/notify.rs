//! Webhook notifications for run and instance outcomes.
//!
//! Notifications are fire-and-forget: delivery failures are logged and
//! never propagated, so a dead webhook can never abort the monitoring loop.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification sink consumed by the scheduler and orchestrator.
pub trait Notify {
    fn notify(&self, header: &str, body: &str, success: bool);
}

/// Sink that drops every message; used when notifications are disabled.
pub struct NoopNotifier;

impl Notify for NoopNotifier {
    fn notify(&self, _header: &str, _body: &str, _success: bool) {}
}

/// Webhook-backed sink with separate success and failure channels. A missing
/// URL disables the matching channel.
pub struct WebhookNotifier {
    client: Client,
    success_url: Option<String>,
    failure_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(success_url: Option<String>, failure_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(NOTIFY_TIMEOUT)
            .timeout(NOTIFY_TIMEOUT)
            .user_agent("vigil-monitor")
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            success_url,
            failure_url,
        })
    }

    fn post(&self, url: &str, header: &str, body: &str) -> Result<()> {
        let payload = json!({
            "blocks": [
                {"type": "header", "text": {"type": "plain_text", "text": header}},
                {"type": "section", "text": {"type": "mrkdwn", "text": body}},
            ]
        });
        self.client
            .post(url)
            .json(&payload)
            .send()
            .context("Webhook request failed")?
            .error_for_status()
            .context("Webhook returned an error status")?;
        Ok(())
    }
}

impl Notify for WebhookNotifier {
    fn notify(&self, header: &str, body: &str, success: bool) {
        let url = if success {
            self.success_url.as_deref()
        } else {
            self.failure_url.as_deref()
        };
        let Some(url) = url else {
            debug!("No webhook configured for this channel, skipping notification");
            return;
        };
        if let Err(e) = self.post(url, header, body) {
            warn!("Notification failed: {e:#}");
        }
    }
}
