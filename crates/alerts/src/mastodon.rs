//! Mastodon status notifications.

use crate::sender::{status_error, AlertSender, SendError};
use crate::tickers::{display_title, TickerNames};
use async_trait::async_trait;
use hvcwatch_core::Timeframe;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Mastodon's default status length limit.
pub const MAX_STATUS_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl StatusResponse {
    fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Posts a public status per alert.
pub struct MastodonNotifier {
    client: reqwest::Client,
    statuses_url: String,
    access_token: String,
    names: Option<Arc<TickerNames>>,
}

impl MastodonNotifier {
    pub fn new(
        client: reqwest::Client,
        server_url: &str,
        access_token: String,
        names: Option<Arc<TickerNames>>,
    ) -> Self {
        Self {
            client,
            statuses_url: format!("{}/api/v1/statuses", server_url.trim_end_matches('/')),
            access_token,
            names,
        }
    }

    pub fn statuses_url(&self) -> &str {
        &self.statuses_url
    }

    /// Status text, cut to [`MAX_STATUS_CHARS`].
    pub fn build_status(&self, ticker: &str, timeframe: Timeframe) -> String {
        let name = self.names.as_deref().and_then(|n| n.name(ticker));
        let status = format!(
            "📊 {}\nAdded to HVC {}\n\n${} #HVC #stocks",
            display_title(ticker, name),
            timeframe.label(),
            ticker
        );

        if status.chars().count() <= MAX_STATUS_CHARS {
            status
        } else {
            let mut cut: String = status.chars().take(MAX_STATUS_CHARS - 1).collect();
            cut.push('…');
            cut
        }
    }
}

#[async_trait]
impl AlertSender for MastodonNotifier {
    async fn send(&self, ticker: &str, timeframe: Timeframe) -> Result<(), SendError> {
        info!(ticker, %timeframe, "Sending to Mastodon");

        let status = self.build_status(ticker, timeframe);
        let params = [("status", status.as_str()), ("visibility", "public")];

        let response = self
            .client
            .post(&self.statuses_url)
            .bearer_auth(&self.access_token)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("mastodon", response).await);
        }

        // The status is up once we have a 2xx; the body only feeds the log line
        let body = response.text().await.unwrap_or_default();
        match StatusResponse::parse(&body) {
            Ok(posted) => info!(
                ticker,
                status_id = %posted.id,
                url = posted.url.as_deref().unwrap_or(""),
                "Mastodon status posted"
            ),
            Err(e) => warn!(ticker, error = %e, "Mastodon status posted, response unreadable"),
        }
        Ok(())
    }
}
