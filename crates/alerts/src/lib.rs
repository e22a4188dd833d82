//! HVC alert deduplication and notification.
//!
//! This crate provides:
//! - SQLite-backed record of sent weekly/monthly alerts
//! - Discord and Mastodon notification platforms
//! - The per-message alert pipeline

pub mod config;
pub mod db;
pub mod discord;
pub mod mastodon;
pub mod pipeline;
pub mod sender;
pub mod tickers;

pub use config::{
    AlertRecord, MastodonSettings, PipelineConfig, PlatformSettings, TimeframeToggles,
};
pub use db::{AlertStore, StoreError};
pub use pipeline::{
    AlertPipeline, DiscardReason, MessageOutcome, PipelineError, TickerOutcome, TickerStatus,
};
pub use sender::{AlertSender, Platform, SendError};
pub use tickers::{TickerNames, TickerNamesError};

#[cfg(test)]
mod tests {
    #[test]
    fn test_ticker_names_error_is_public() {
        let err: crate::TickerNamesError = crate::TickerNames::from_json("not json").unwrap_err();
        assert!(matches!(err, crate::TickerNamesError::Json(_)));
    }
}
