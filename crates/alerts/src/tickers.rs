//! Company names for ticker symbols, from the SEC `company_tickers.json` file.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TickerNamesError {
    #[error("Failed to read ticker file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid ticker file: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row of the SEC file: `{"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}`.
#[derive(Debug, Deserialize)]
struct SecCompany {
    ticker: String,
    title: String,
}

/// Ticker to company name lookup.
#[derive(Debug, Clone, Default)]
pub struct TickerNames {
    names: HashMap<String, String>,
}

impl TickerNames {
    /// Parse the SEC JSON document (an object keyed by row index).
    pub fn from_json(json: &str) -> Result<Self, TickerNamesError> {
        let rows: HashMap<String, SecCompany> = serde_json::from_str(json)?;
        let names = rows
            .into_values()
            .map(|row| (row.ticker.to_uppercase(), row.title))
            .collect();
        Ok(Self { names })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TickerNamesError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn name(&self, ticker: &str) -> Option<&str> {
        self.names.get(&ticker.to_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// "Apple Inc. (AAPL)", or just the ticker when the name is unknown.
pub fn display_title(ticker: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} ({})", name, ticker),
        None => ticker.to_string(),
    }
}

pub fn logo_url(ticker: &str) -> String {
    format!(
        "https://static.stocktitan.net/company-logo/{}.webp",
        ticker.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
        "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"}
    }"#;

    #[test]
    fn test_parse_sec_file() {
        let names = TickerNames::from_json(SAMPLE).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names.name("AAPL"), Some("Apple Inc."));
        assert_eq!(names.name("msft"), Some("MICROSOFT CORP"));
        assert_eq!(names.name("NVDA"), None);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            TickerNames::from_json("[1, 2"),
            Err(TickerNamesError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TickerNames::load("/nonexistent/company_tickers.json"),
            Err(TickerNamesError::Io(_))
        ));
    }

    #[test]
    fn test_display_title() {
        assert_eq!(display_title("AAPL", Some("Apple Inc.")), "Apple Inc. (AAPL)");
        assert_eq!(display_title("AAPL", None), "AAPL");
    }

    #[test]
    fn test_logo_url() {
        assert_eq!(
            logo_url("AAPL"),
            "https://static.stocktitan.net/company-logo/aapl.webp"
        );
    }
}
