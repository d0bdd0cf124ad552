use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::config::Settings;

/// Prefix of every chat message.
pub const DIGEST_HEADER: &str = "The following pull requests are OPEN:\n\n";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Chat webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Outcome of a notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Empty digest, nothing was sent
    Skipped,
    Delivered,
    /// The webhook answered with a non-200 status; logged, not fatal
    Rejected(StatusCode),
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    text: String,
}

/// Posts digests to a chat webhook.
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: String,
    token: String,
}

impl Notifier {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            webhook_url: settings.slack_webhook_url.clone(),
            token: settings.slack_access_token.clone(),
        }
    }

    /// Post `digest` to the webhook. An empty digest sends nothing.
    #[instrument(skip_all, fields(digest_bytes = digest.len()))]
    pub async fn post_digest(&self, digest: &str) -> Result<Delivery, NotifyError> {
        if digest.is_empty() {
            debug!("empty digest, skipping notification");
            return Ok(Delivery::Skipped);
        }

        let payload = WebhookPayload {
            text: format!("{DIGEST_HEADER}{digest}"),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(status = status.as_u16(), "got a non-200 status while posting to the chat webhook");
            return Ok(Delivery::Rejected(status));
        }

        info!("digest posted to chat webhook");
        Ok(Delivery::Delivered)
    }
}
