//! Operator alerts for runs that end abnormally.
//!
//! Alerts go to a Discord-compatible webhook (`{"content": "..."}`). Delivery
//! is best effort: callers log a failed delivery and move on.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::types::{FailReason, FeedbackResult};
use crate::io::config::AlertConfig;

/// Webhook body limit enforced by Discord.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts alert text to a webhook.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    /// Notifier for the configured webhook, or `None` when alerts are off.
    pub fn from_config(config: &AlertConfig) -> Result<Option<Self>> {
        let Some(url) = config.webhook_url() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .build()
            .context("build alert http client")?;
        Ok(Some(Self {
            http,
            url: url.to_string(),
            timeout: config.timeout(),
        }))
    }

    #[instrument(skip_all)]
    pub async fn notify(&self, text: &str) -> Result<()> {
        let content: String = text.chars().take(MAX_CONTENT_CHARS).collect();
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&WebhookPayload { content: &content })
            .send()
            .await
            .context("send alert webhook")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("alert webhook returned {status}"));
        }
        debug!(%status, "alert delivered");
        Ok(())
    }
}

/// Alert text for a result operators should hear about, `None` otherwise.
///
/// Only faults outside the designed outcomes alert: internal errors and runs
/// that hit the overall deadline.
pub fn result_alert(path: &str, result: &FeedbackResult) -> Option<String> {
    match result {
        FeedbackResult::Fail {
            reason: reason @ (FailReason::Internal | FailReason::TimedOut),
            message,
            ..
        } => Some(format!(
            "**피드백 실패** ({})\nPath: `{path}`\n메시지: {message}",
            reason.as_str()
        )),
        _ => None,
    }
}

/// Alert text for a request that failed with a server error.
pub fn error_alert(path: &str, detail: &str) -> String {
    format!("**서버 내부 오류**\nPath: `{path}`\n오류: `{detail}`")
}
