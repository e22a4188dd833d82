//! Inbound alert messages and what is extracted from them.

use crate::extract::{extract_tickers, extract_timeframe};
use crate::timeframe::Timeframe;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

/// Timestamp carried by an inbound message.
///
/// Naive times are taken to already be in the exchange's local timezone;
/// aware times are converted to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTime {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl MessageTime {
    /// This instant expressed in `tz`.
    pub fn in_timezone(&self, tz: Tz) -> DateTime<Tz> {
        match *self {
            MessageTime::Aware(dt) => dt.with_timezone(&tz),
            MessageTime::Naive(naive) => localize(tz, naive),
        }
    }

    /// Calendar date of this instant in `tz`.
    pub fn date_in(&self, tz: Tz) -> NaiveDate {
        self.in_timezone(tz).date_naive()
    }
}

/// Attach `tz` to a wall-clock time. Ambiguous times take the earlier
/// instant; times inside a DST gap are pushed forward one hour.
fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

impl From<NaiveDateTime> for MessageTime {
    fn from(naive: NaiveDateTime) -> Self {
        MessageTime::Naive(naive)
    }
}

impl From<DateTime<FixedOffset>> for MessageTime {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        MessageTime::Aware(dt)
    }
}

impl From<DateTime<Utc>> for MessageTime {
    fn from(dt: DateTime<Utc>) -> Self {
        MessageTime::Aware(dt.fixed_offset())
    }
}

impl From<DateTime<Tz>> for MessageTime {
    fn from(dt: DateTime<Tz>) -> Self {
        MessageTime::Aware(dt.fixed_offset())
    }
}

impl fmt::Display for MessageTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTime::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%d %H:%M")),
            MessageTime::Aware(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M %:z")),
        }
    }
}

/// One email as delivered by the mailbox poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub subject: Option<String>,
    pub timestamp: MessageTime,
}

impl InboundMessage {
    pub fn new(subject: Option<String>, timestamp: impl Into<MessageTime>) -> Self {
        Self {
            subject,
            timestamp: timestamp.into(),
        }
    }

    /// Subject text, or `None` when absent or blank.
    pub fn subject_text(&self) -> Option<&str> {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Tickers and timeframe pulled out of one message subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAlert {
    /// Uppercase symbols in order of appearance, futures excluded.
    pub tickers: Vec<String>,
    pub timeframe: Timeframe,
    pub source_timestamp: MessageTime,
}

impl ExtractedAlert {
    pub fn from_subject(subject: &str, source_timestamp: MessageTime) -> Self {
        Self {
            tickers: extract_tickers(subject),
            timeframe: extract_timeframe(subject),
            source_timestamp,
        }
    }

    /// Date the alert is recorded under, taken from the message timestamp.
    pub fn alert_date(&self, tz: Tz) -> NaiveDate {
        self.source_timestamp.date_in(tz)
    }
}
