//! Per-message alert admission and dispatch.

use crate::config::PipelineConfig;
use crate::db::AlertStore;
use crate::sender::{AlertSender, Platform};
use chrono::NaiveDate;
use hvcwatch_core::{
    CalendarError, ExtractedAlert, InboundMessage, MarketGate, Timeframe, TradingCalendar,
};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot determine market hours: {0}")]
    Calendar(#[from] CalendarError),
}

/// Why a message was dropped before any ticker was considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NoSubject,
    OutsideMarketHours,
    TimeframeDisabled(Timeframe),
}

/// What happened to one ticker from a processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerStatus {
    /// Dispatched and recorded. Counts are per platform.
    Recorded { delivered: usize, failed: usize },
    /// Already alerted in this period.
    Suppressed,
    /// The dedup store could not be read or written.
    StoreFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerOutcome {
    pub ticker: String,
    pub status: TickerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Discarded(DiscardReason),
    Processed {
        timeframe: Timeframe,
        alert_date: NaiveDate,
        tickers: Vec<TickerOutcome>,
    },
}

impl MessageOutcome {
    /// Number of tickers that went out to the platforms.
    pub fn recorded_count(&self) -> usize {
        match self {
            MessageOutcome::Discarded(_) => 0,
            MessageOutcome::Processed { tickers, .. } => tickers
                .iter()
                .filter(|t| matches!(t.status, TickerStatus::Recorded { .. }))
                .count(),
        }
    }
}

/// Glues the market gate, subject extraction, timeframe policy and dedup
/// store together, then fans out to the notification platforms.
pub struct AlertPipeline<C, S = Platform> {
    gate: MarketGate<C>,
    store: AlertStore,
    senders: Vec<S>,
    config: PipelineConfig,
}

impl<C: TradingCalendar, S: AlertSender + fmt::Display> AlertPipeline<C, S> {
    pub fn new(calendar: C, store: AlertStore, senders: Vec<S>, config: PipelineConfig) -> Self {
        Self {
            gate: MarketGate::new(calendar, config.market_hours_buffer),
            store,
            senders,
            config,
        }
    }

    pub fn store(&self) -> &AlertStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one inbound message through the pipeline.
    ///
    /// Only a calendar failure is returned as an error, and in that case
    /// nothing has been sent or recorded. Store and platform failures are
    /// logged and reported per ticker.
    pub async fn process_message(
        &self,
        message: &InboundMessage,
    ) -> Result<MessageOutcome, PipelineError> {
        let Some(subject) = message.subject_text() else {
            info!("Email has no subject");
            return Ok(MessageOutcome::Discarded(DiscardReason::NoSubject));
        };

        if !self.gate.admits(message.timestamp)? {
            info!(subject, date = %message.timestamp, "Email arrived outside market hours");
            return Ok(MessageOutcome::Discarded(DiscardReason::OutsideMarketHours));
        }

        let alert = ExtractedAlert::from_subject(subject, message.timestamp);
        let timeframe = alert.timeframe;

        if !self.config.timeframes.is_enabled(timeframe) {
            info!(subject, %timeframe, "Timeframe disabled, skipping alert");
            return Ok(MessageOutcome::Discarded(DiscardReason::TimeframeDisabled(
                timeframe,
            )));
        }

        let alert_date = alert.alert_date(self.gate.timezone());
        info!(
            tickers = ?alert.tickers,
            %timeframe,
            %alert_date,
            "Processing HVC alert"
        );

        let mut tickers = Vec::with_capacity(alert.tickers.len());
        for ticker in &alert.tickers {
            let status = self.process_ticker(ticker, timeframe, alert_date).await;
            tickers.push(TickerOutcome {
                ticker: ticker.clone(),
                status,
            });
        }

        Ok(MessageOutcome::Processed {
            timeframe,
            alert_date,
            tickers,
        })
    }

    async fn process_ticker(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        alert_date: NaiveDate,
    ) -> TickerStatus {
        match self.store.should_alert(ticker, timeframe, alert_date).await {
            Ok(true) => {}
            Ok(false) => {
                info!(ticker, %timeframe, %alert_date, "Skipping duplicate alert");
                return TickerStatus::Suppressed;
            }
            Err(e) => {
                error!(ticker, %timeframe, error = %e, "Dedup check failed");
                return TickerStatus::StoreFailed;
            }
        }

        let (delivered, failed) = self.dispatch(ticker, timeframe).await;

        if let Err(e) = self.store.record_alert(ticker, timeframe, alert_date).await {
            error!(ticker, %timeframe, error = %e, "Failed to record alert");
            return TickerStatus::StoreFailed;
        }

        TickerStatus::Recorded { delivered, failed }
    }

    /// Send to every platform; one failing doesn't stop the others.
    async fn dispatch(&self, ticker: &str, timeframe: Timeframe) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;

        for sender in &self.senders {
            match sender.send(ticker, timeframe).await {
                Ok(()) => {
                    debug!(ticker, platform = %sender, "Alert sent");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(ticker, platform = %sender, error = %e, "Failed to send alert");
                    failed += 1;
                }
            }
        }

        (delivered, failed)
    }
}
