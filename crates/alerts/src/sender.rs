//! Notification platforms.

use crate::config::PlatformSettings;
use crate::discord::DiscordNotifier;
use crate::mastodon::MastodonNotifier;
use crate::tickers::TickerNames;
use async_trait::async_trait;
use hvcwatch_core::Timeframe;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Timeout for a single webhook or API call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{platform} returned status {status}: {body}")]
    Status {
        platform: &'static str,
        status: u16,
        body: String,
    },
}

/// Something that can deliver a ticker alert.
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, ticker: &str, timeframe: Timeframe) -> Result<(), SendError>;
}

/// Configured notification platforms.
pub enum Platform {
    Discord(DiscordNotifier),
    Mastodon(MastodonNotifier),
}

impl Platform {
    /// Build every platform enabled in `settings`. Discord is always
    /// present; Mastodon only when credentials are configured.
    pub fn from_settings(
        settings: &PlatformSettings,
        names: Option<Arc<TickerNames>>,
    ) -> Result<Vec<Platform>, SendError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let mut platforms = vec![Platform::Discord(DiscordNotifier::new(
            client.clone(),
            settings.discord_webhook_url.clone(),
            settings.transparent_png.clone(),
            names.clone(),
        ))];

        if let Some(mastodon) = &settings.mastodon {
            platforms.push(Platform::Mastodon(MastodonNotifier::new(
                client,
                &mastodon.server_url,
                mastodon.access_token.clone(),
                names,
            )));
        }

        Ok(platforms)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Discord(_) => "discord",
            Platform::Mastodon(_) => "mastodon",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
impl AlertSender for Platform {
    async fn send(&self, ticker: &str, timeframe: Timeframe) -> Result<(), SendError> {
        match self {
            Platform::Discord(discord) => discord.send(ticker, timeframe).await,
            Platform::Mastodon(mastodon) => mastodon.send(ticker, timeframe).await,
        }
    }
}

/// Error for a non-success HTTP response.
pub(crate) async fn status_error(platform: &'static str, response: reqwest::Response) -> SendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SendError::Status {
        platform,
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MastodonSettings;

    fn settings(mastodon: Option<MastodonSettings>) -> PlatformSettings {
        PlatformSettings {
            discord_webhook_url: "https://discord.com/api/webhooks/test".to_string(),
            mastodon,
            transparent_png: crate::config::DEFAULT_TRANSPARENT_PNG.to_string(),
        }
    }

    #[test]
    fn test_discord_only() {
        let platforms = Platform::from_settings(&settings(None), None).unwrap();
        let names: Vec<_> = platforms.iter().map(Platform::name).collect();
        assert_eq!(names, vec!["discord"]);
    }

    #[test]
    fn test_discord_and_mastodon() {
        let mastodon = MastodonSettings {
            server_url: "https://mastodon.social".to_string(),
            access_token: "token".to_string(),
        };
        let platforms = Platform::from_settings(&settings(Some(mastodon)), None).unwrap();
        let names: Vec<_> = platforms.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["discord", "mastodon"]);
    }

    #[test]
    fn test_status_error_display() {
        let err = SendError::Status {
            platform: "discord",
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "discord returned status 429: rate limited");
    }
}
