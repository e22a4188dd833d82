//! Alert timeframes and the calendar periods they cover.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Repeat cadence of an HVC alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown timeframe: {0}")]
pub struct ParseTimeframeError(pub String);

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly];

    /// Lowercase tag, as stored in the alerts table.
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }

    /// Capitalized name for notification text.
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Daily => "Daily",
            Timeframe::Weekly => "Weekly",
            Timeframe::Monthly => "Monthly",
        }
    }

    /// Daily alerts are never deduplicated or persisted.
    #[inline]
    pub fn is_deduplicated(self) -> bool {
        !matches!(self, Timeframe::Daily)
    }

    /// First day of the covering period for `date`.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Timeframe::Daily => date,
            Timeframe::Weekly => week_monday(date),
            Timeframe::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Last day of the covering period for `date`.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        let start = self.period_start(date);
        match self {
            Timeframe::Daily => date,
            Timeframe::Weekly => start + Days::new(6),
            Timeframe::Monthly => start
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(date),
        }
    }

    /// Whether two dates fall in the same covering period.
    pub fn same_period(self, a: NaiveDate, b: NaiveDate) -> bool {
        self.period_start(a) == self.period_start(b)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Timeframe::Daily),
            "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            other => Err(ParseTimeframeError(other.to_string())),
        }
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}
