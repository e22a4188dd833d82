//! Ticker and timeframe extraction from alert subject lines.

use crate::timeframe::Timeframe;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// "symbol(s)[:] <list> was|were added", case-insensitive.
static TICKERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bsymbols?\b:?\s*([\w/,\s]+)\s+(?:were|was)\s+added")
        .expect("ticker pattern is valid")
});

/// Pull ticker symbols out of a subject line.
///
/// Symbols are uppercased and returned in order of appearance. Anything
/// containing a `/` is a futures contract and is dropped. A subject that
/// doesn't match yields an empty list.
pub fn extract_tickers(subject: &str) -> Vec<String> {
    let Some(list) = TICKERS_RE.captures(subject).and_then(|c| c.get(1)) else {
        debug!(subject, "No tickers found in subject");
        return Vec::new();
    };

    let tickers: Vec<String> = list
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.contains('/'))
        .map(str::to_uppercase)
        .collect();

    debug!(subject, ?tickers, "Extracted tickers");
    tickers
}

/// Classify the alert timeframe. "weekly" wins over "monthly"; anything
/// else is daily.
pub fn extract_timeframe(subject: &str) -> Timeframe {
    let subject = subject.to_lowercase();
    if subject.contains("weekly") {
        Timeframe::Weekly
    } else if subject.contains("monthly") {
        Timeframe::Monthly
    } else {
        Timeframe::Daily
    }
}
