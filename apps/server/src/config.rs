//! Application configuration.
//!
//! Built once at startup from environment variables (after `.env` is
//! loaded) with command-line overrides applied on top.

use hvcwatch_alerts::config::DEFAULT_TRANSPARENT_PNG;
use hvcwatch_alerts::{MastodonSettings, PipelineConfig, PlatformSettings, TimeframeToggles};
use hvcwatch_core::DEFAULT_BUFFER_HOURS;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_IMAP_HOST: &str = "imap.fastmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_IMAP_FOLDER: &str = "Trading/ToS Alerts";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Cannot determine home directory for the default database path; set HVCWATCH_DB_PATH")]
    NoHomeDir,
}

/// IMAP account and folder to watch.
#[derive(Clone, PartialEq, Eq)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub folder: String,
    /// How long one IDLE wait lasts before re-issuing it.
    pub idle_timeout: Duration,
}

impl fmt::Debug for ImapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("folder", &self.folder)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub db_path: Option<PathBuf>,
    pub buffer_hours: Option<u32>,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub imap: ImapSettings,
    pub platforms: PlatformSettings,
    pub pipeline: PipelineConfig,
    pub db_path: PathBuf,
    pub log_level: String,
    /// SEC `company_tickers.json`, for company names in notifications.
    pub sec_tickers_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read settings from the process environment. Names are matched
    /// case-insensitively.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build from any key lookup; keys are asked for in upper case.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };

        let imap = ImapSettings {
            host: env.string_or("IMAP_HOST", DEFAULT_IMAP_HOST),
            port: env.parsed_or("IMAP_PORT", DEFAULT_IMAP_PORT, "a port number")?,
            user: env.required("FASTMAIL_USER")?,
            password: env.required("FASTMAIL_PASS")?,
            folder: env.string_or("IMAP_FOLDER", DEFAULT_IMAP_FOLDER),
            idle_timeout: Duration::from_secs(env.parsed_or(
                "IMAP_IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
                "a number of seconds",
            )?),
        };

        let mastodon = match (
            env.optional("MASTODON_SERVER_URL"),
            env.optional("MASTODON_ACCESS_TOKEN"),
        ) {
            (Some(server_url), Some(access_token)) => Some(MastodonSettings {
                server_url,
                access_token,
            }),
            _ => None,
        };

        let platforms = PlatformSettings {
            discord_webhook_url: env.required("DISCORD_WEBHOOK_URL")?,
            mastodon,
            transparent_png: env.string_or("TRANSPARENT_PNG", DEFAULT_TRANSPARENT_PNG),
        };

        let defaults = TimeframeToggles::default();
        let pipeline = PipelineConfig {
            timeframes: TimeframeToggles {
                daily: env.bool_or("HVC_DAILY_ENABLED", defaults.daily)?,
                weekly: env.bool_or("HVC_WEEKLY_ENABLED", defaults.weekly)?,
                monthly: env.bool_or("HVC_MONTHLY_ENABLED", defaults.monthly)?,
            },
            market_hours_buffer: env.parsed_or(
                "MARKET_HOURS_BUFFER",
                DEFAULT_BUFFER_HOURS,
                "a whole number of hours",
            )?,
        };

        let db_path = match env.optional("HVCWATCH_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        Ok(Self {
            imap,
            platforms,
            pipeline,
            db_path,
            log_level: env.string_or("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            sec_tickers_path: env.optional("SEC_TICKERS_PATH").map(PathBuf::from),
        })
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(path) = overrides.db_path {
            self.db_path = path;
        }
        if let Some(hours) = overrides.buffer_hours {
            self.pipeline.market_hours_buffer = hours;
        }
        self
    }
}

/// `~/.hvcwatch/alerts.db`
pub fn default_db_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".hvcwatch").join("alerts.db"))
        .ok_or(ConfigError::NoHomeDir)
}

/// Accepts true/false, 1/0, yes/no, on/off in any case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

struct Env<'a, F> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Set and non-blank.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T: FromStr>(
        &self,
        key: &'static str,
        default: T,
        expected: &'static str,
    ) -> Result<T, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key,
                value,
                expected,
            }),
        }
    }

    fn bool_or(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                key,
                value,
                expected: "a boolean",
            }),
        }
    }
}
