//! SQLite store of sent HVC alerts.
//!
//! Keeps weekly and monthly alerts from repeating within the same week or
//! month for a ticker. Daily alerts are never stored.

use crate::config::AlertRecord;
use chrono::NaiveDate;
use hvcwatch_core::Timeframe;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid alert date in store: {0}")]
    InvalidDate(String),
    #[error("Invalid timeframe in store: {0}")]
    InvalidTimeframe(String),
}

/// Handle to the alerts database.
///
/// `should_alert` and `record_alert` are separate calls with no lock held
/// between them. Two pipelines sharing one database could both pass the
/// check for the same ticker and period and both notify; a single
/// sequential pipeline cannot.
#[derive(Clone)]
pub struct AlertStore {
    pool: SqlitePool,
}

impl AlertStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        Self::connect_with(options).await
    }

    /// Connect using a SQLite URL such as `sqlite::memory:`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        // One connection: access is sequential, and an in-memory database
        // exists only on the connection that created it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hvc_alerts (
                ticker TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                alert_date TEXT NOT NULL,
                PRIMARY KEY (ticker, timeframe, alert_date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ticker_timeframe ON hvc_alerts(ticker, timeframe)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent recorded alert date for a ticker and timeframe.
    pub async fn latest_alert_date(
        &self,
        ticker: &str,
        timeframe: Timeframe,
    ) -> Result<Option<NaiveDate>, StoreError> {
        let latest = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(alert_date) FROM hvc_alerts WHERE ticker = ? AND timeframe = ?",
        )
        .bind(ticker.to_uppercase())
        .bind(timeframe.as_str())
        .fetch_one(&self.pool)
        .await?;

        latest.as_deref().map(parse_date).transpose()
    }

    /// Whether any alert is recorded in the period covering `date`.
    async fn has_alert_in_period(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM hvc_alerts
            WHERE ticker = ? AND timeframe = ? AND alert_date BETWEEN ? AND ?
            "#,
        )
        .bind(ticker.to_uppercase())
        .bind(timeframe.as_str())
        .bind(format_date(timeframe.period_start(date)))
        .bind(format_date(timeframe.period_end(date)))
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Whether an alert for this ticker should go out on `alert_date`.
    ///
    /// Daily always passes without touching the database. Weekly passes
    /// unless the latest alert falls in the same Monday-based week; monthly
    /// unless it falls in the same calendar month. A message older than the
    /// latest recorded period is checked against its own period instead.
    pub async fn should_alert(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        alert_date: NaiveDate,
    ) -> Result<bool, StoreError> {
        if !timeframe.is_deduplicated() {
            return Ok(true);
        }

        let Some(last_alert) = self.latest_alert_date(ticker, timeframe).await? else {
            debug!(ticker, %timeframe, "No previous alert found");
            return Ok(true);
        };

        let last_period = timeframe.period_start(last_alert);
        let current_period = timeframe.period_start(alert_date);

        let should_send = if last_period < current_period {
            true
        } else if last_period == current_period {
            false
        } else {
            !self
                .has_alert_in_period(ticker, timeframe, alert_date)
                .await?
        };

        debug!(
            ticker,
            %timeframe,
            %last_alert,
            %last_period,
            %current_period,
            should_send,
            "Dedup check"
        );
        Ok(should_send)
    }

    /// Record that an alert went out. Daily alerts are not stored;
    /// recording the same date twice is a no-op.
    pub async fn record_alert(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        alert_date: NaiveDate,
    ) -> Result<(), StoreError> {
        if !timeframe.is_deduplicated() {
            return Ok(());
        }

        let record = AlertRecord::new(ticker, timeframe, alert_date);
        sqlx::query(
            "INSERT OR REPLACE INTO hvc_alerts (ticker, timeframe, alert_date) VALUES (?, ?, ?)",
        )
        .bind(&record.ticker)
        .bind(record.timeframe.as_str())
        .bind(format_date(record.alert_date))
        .execute(&self.pool)
        .await?;

        debug!(
            ticker = %record.ticker,
            timeframe = %record.timeframe,
            alert_date = %record.alert_date,
            "Recorded alert"
        );
        Ok(())
    }

    /// All recorded alerts for a ticker, oldest first.
    pub async fn alerts_for(&self, ticker: &str) -> Result<Vec<AlertRecord>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT ticker, timeframe, alert_date FROM hvc_alerts
            WHERE ticker = ?
            ORDER BY alert_date, timeframe
            "#,
        )
        .bind(ticker.to_uppercase())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(ticker, timeframe, alert_date)| -> Result<AlertRecord, StoreError> {
                Ok(AlertRecord {
                    ticker,
                    timeframe: timeframe
                        .parse()
                        .map_err(|_| StoreError::InvalidTimeframe(timeframe.clone()))?,
                    alert_date: parse_date(&alert_date)?,
                })
            })
            .collect()
    }

    /// Total number of stored alerts.
    pub async fn count_alerts(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hvc_alerts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| StoreError::InvalidDate(s.to_string()))
}
