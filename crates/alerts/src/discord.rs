//! Discord webhook notifications.

use crate::sender::{status_error, AlertSender, SendError};
use crate::tickers::{display_title, logo_url, TickerNames};
use async_trait::async_trait;
use hvcwatch_core::Timeframe;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const EMBED_COLOR: u32 = 0x03b2f8;
const FOOTER: &str = "HVC Watch";

/// Posts one embed per alert to a Discord webhook.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
    image_url: String,
    names: Option<Arc<TickerNames>>,
}

impl DiscordNotifier {
    pub fn new(
        client: reqwest::Client,
        webhook_url: String,
        image_url: String,
        names: Option<Arc<TickerNames>>,
    ) -> Self {
        Self {
            client,
            webhook_url,
            image_url,
            names,
        }
    }

    fn company_name(&self, ticker: &str) -> Option<&str> {
        self.names.as_deref().and_then(|n| n.name(ticker))
    }

    /// Webhook body for an alert.
    pub fn build_payload(&self, ticker: &str, timeframe: Timeframe) -> Value {
        json!({
            "embeds": [{
                "title": display_title(ticker, self.company_name(ticker)),
                "description": format!("Added to **HVC {}**", timeframe.label()),
                "color": EMBED_COLOR,
                "thumbnail": { "url": logo_url(ticker) },
                "image": { "url": self.image_url },
                "footer": { "text": FOOTER },
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }]
        })
    }
}

#[async_trait]
impl AlertSender for DiscordNotifier {
    async fn send(&self, ticker: &str, timeframe: Timeframe) -> Result<(), SendError> {
        info!(ticker, %timeframe, "Sending to Discord");

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.build_payload(ticker, timeframe))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("discord", response).await);
        }

        info!(status_code = response.status().as_u16(), "Discord response");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TRANSPARENT_PNG;

    fn notifier(names: Option<Arc<TickerNames>>) -> DiscordNotifier {
        DiscordNotifier::new(
            reqwest::Client::new(),
            "https://discord.com/api/webhooks/test".to_string(),
            DEFAULT_TRANSPARENT_PNG.to_string(),
            names,
        )
    }

    #[test]
    fn test_payload_with_company_name() {
        let names = TickerNames::from_json(
            r#"{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}}"#,
        )
        .unwrap();
        let payload = notifier(Some(Arc::new(names))).build_payload("AAPL", Timeframe::Weekly);
        let embed = &payload["embeds"][0];

        assert_eq!(embed["title"], "Apple Inc. (AAPL)");
        assert_eq!(embed["description"], "Added to **HVC Weekly**");
        assert_eq!(embed["color"], 0x03b2f8);
        assert_eq!(
            embed["thumbnail"]["url"],
            "https://static.stocktitan.net/company-logo/aapl.webp"
        );
        assert_eq!(embed["image"]["url"], DEFAULT_TRANSPARENT_PNG);
        assert_eq!(embed["footer"]["text"], "HVC Watch");
        assert!(embed["timestamp"].is_string());
    }

    #[test]
    fn test_payload_without_names() {
        let payload = notifier(None).build_payload("MSFT", Timeframe::Monthly);
        assert_eq!(payload["embeds"][0]["title"], "MSFT");
        assert_eq!(payload["embeds"][0]["description"], "Added to **HVC Monthly**");
    }
}
