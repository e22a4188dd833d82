//! Alert policy and platform settings.

use chrono::NaiveDate;
use hvcwatch_core::{Timeframe, DEFAULT_BUFFER_HOURS};
use serde::{Deserialize, Serialize};

/// Per-timeframe enable switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeToggles {
    pub daily: bool,
    pub weekly: bool,
    pub monthly: bool,
}

impl Default for TimeframeToggles {
    fn default() -> Self {
        Self {
            daily: false,
            weekly: true,
            monthly: true,
        }
    }
}

impl TimeframeToggles {
    pub fn is_enabled(&self, timeframe: Timeframe) -> bool {
        match timeframe {
            Timeframe::Daily => self.daily,
            Timeframe::Weekly => self.weekly,
            Timeframe::Monthly => self.monthly,
        }
    }

    /// Enabled timeframes, for the startup log line.
    pub fn enabled(&self) -> Vec<Timeframe> {
        Timeframe::ALL
            .into_iter()
            .filter(|tf| self.is_enabled(*tf))
            .collect()
    }
}

/// Configuration for the alert pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub timeframes: TimeframeToggles,
    /// Hours before the open / after the close that still count as market hours.
    pub market_hours_buffer: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeframes: TimeframeToggles::default(),
            market_hours_buffer: DEFAULT_BUFFER_HOURS,
        }
    }
}

/// Mastodon account used for posting statuses.
#[derive(Clone, PartialEq, Eq)]
pub struct MastodonSettings {
    pub server_url: String,
    pub access_token: String,
}

impl std::fmt::Debug for MastodonSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonSettings")
            .field("server_url", &self.server_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Notification platforms to fan out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSettings {
    pub discord_webhook_url: String,
    pub mastodon: Option<MastodonSettings>,
    /// Wide transparent image attached to Discord embeds.
    pub transparent_png: String,
}

pub const DEFAULT_TRANSPARENT_PNG: &str = "https://major.io/transparent.png";

/// One persisted "alert sent" fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertRecord {
    pub ticker: String,
    pub timeframe: Timeframe,
    pub alert_date: NaiveDate,
}

impl AlertRecord {
    pub fn new(ticker: &str, timeframe: Timeframe, alert_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            timeframe,
            alert_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_defaults() {
        let toggles = TimeframeToggles::default();
        assert!(!toggles.is_enabled(Timeframe::Daily));
        assert!(toggles.is_enabled(Timeframe::Weekly));
        assert!(toggles.is_enabled(Timeframe::Monthly));
        assert_eq!(toggles.enabled(), vec![Timeframe::Weekly, Timeframe::Monthly]);
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.market_hours_buffer, 1);
    }

    #[test]
    fn test_alert_record_uppercases_ticker() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 2).unwrap();
        let record = AlertRecord::new("aapl", Timeframe::Weekly, date);
        assert_eq!(record.ticker, "AAPL");
    }

    #[test]
    fn test_mastodon_debug_hides_token() {
        let settings = MastodonSettings {
            server_url: "https://mastodon.social".to_string(),
            access_token: "secret-token".to_string(),
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("mastodon.social"));
    }
}
