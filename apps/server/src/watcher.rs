//! The watch loop: drain unseen mail at startup, then IDLE and drain again
//! whenever the mailbox reports activity.

use crate::mailbox::{Mailbox, MailboxError};
use hvcwatch_alerts::{AlertPipeline, AlertSender, MessageOutcome};
use hvcwatch_core::TradingCalendar;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Running totals for the shutdown summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub messages: usize,
    pub discarded: usize,
    pub tickers_alerted: usize,
    pub failed: usize,
}

pub struct Watcher<M, C, S> {
    mailbox: M,
    pipeline: AlertPipeline<C, S>,
    idle_timeout: Duration,
    stats: WatchStats,
}

impl<M, C, S> Watcher<M, C, S>
where
    M: Mailbox,
    C: TradingCalendar,
    S: AlertSender + fmt::Display,
{
    pub fn new(mailbox: M, pipeline: AlertPipeline<C, S>, idle_timeout: Duration) -> Self {
        Self {
            mailbox,
            pipeline,
            idle_timeout,
            stats: WatchStats::default(),
        }
    }

    pub fn stats(&self) -> WatchStats {
        self.stats
    }

    pub fn into_mailbox(self) -> M {
        self.mailbox
    }

    /// Fetch and process every unseen message. Returns how many were fetched.
    ///
    /// Fetched messages are already marked seen, so the whole batch is
    /// processed even if shutdown is requested meanwhile.
    pub async fn drain(&mut self) -> Result<usize, MailboxError> {
        let messages = self.mailbox.fetch_unseen().await?;
        if messages.is_empty() {
            debug!("No unseen messages");
            return Ok(0);
        }
        info!(count = messages.len(), "Processing unseen messages");

        for message in &messages {
            info!(
                subject = message.subject.as_deref().unwrap_or(""),
                date = %message.timestamp,
                "Found unseen email"
            );
            self.stats.messages += 1;
            match self.pipeline.process_message(message).await {
                Ok(MessageOutcome::Discarded(_)) => self.stats.discarded += 1,
                Ok(outcome) => self.stats.tickers_alerted += outcome.recorded_count(),
                Err(e) => {
                    error!(error = %e, "Failed to process message");
                    self.stats.failed += 1;
                }
            }
        }

        Ok(messages.len())
    }

    /// Drain, then wait for activity until `shutdown` flips to true.
    ///
    /// Shutdown is checked between IDLE waits, never during one, so the
    /// mailbox session is always back in hand for logout. Exit latency is
    /// bounded by the idle timeout.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Result<(), MailboxError> {
        self.drain().await?;
        info!(idle_timeout = ?self.idle_timeout, "Starting email monitoring");

        while !*shutdown.borrow() {
            let active = self.mailbox.wait_for_activity(self.idle_timeout).await?;

            if *shutdown.borrow() {
                debug!("Shutdown requested during IDLE wait");
                break;
            }

            if active {
                info!("New email detected while IDLE");
                self.drain().await?;
            }
        }

        info!("Stopping email monitoring");
        Ok(())
    }
}
