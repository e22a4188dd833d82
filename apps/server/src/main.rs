//! HVC Watch - email alert watcher
//!
//! Watches an IMAP folder for high-volume-candle alerts and relays new
//! tickers to Discord and Mastodon, once per ticker per week or month.

mod config;
mod mailbox;
mod version;
mod watcher;

use clap::Parser;
use config::{AppConfig, ConfigError, Overrides, DEFAULT_LOG_LEVEL};
use hvcwatch_alerts::{AlertPipeline, AlertStore, Platform, SendError, StoreError, TickerNames};
use hvcwatch_core::NyseCalendar;
use mailbox::{ImapMailbox, MailboxError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use version::VersionInfo;
use watcher::Watcher;

/// HVC Watch CLI
#[derive(Parser, Debug)]
#[command(name = "hvcwatch")]
#[command(about = "Relay HVC email alerts to Discord and Mastodon", long_about = None)]
struct Args {
    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL)
    #[arg(short, long)]
    log_level: Option<String>,

    /// SQLite database path (overrides HVCWATCH_DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Hours around the trading session that still count as market hours
    #[arg(long)]
    buffer_hours: Option<u32>,

    /// Process currently unseen mail and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            log_level: self.log_level.clone(),
            db_path: self.db_path.clone(),
            buffer_hours: self.buffer_hours,
        }
    }
}

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Alert database: {0}")]
    Store(#[from] StoreError),

    #[error("Notification setup: {0}")]
    Send(#[from] SendError),

    #[error("Mailbox: {0}")]
    Mailbox(#[from] MailboxError),
}

/// RUST_LOG wins over the configured level when set.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();
}

fn load_ticker_names(config: &AppConfig) -> Option<Arc<TickerNames>> {
    let path = config.sec_tickers_path.as_ref()?;
    match TickerNames::load(path) {
        Ok(names) => {
            info!(path = %path.display(), count = names.len(), "Loaded SEC ticker names");
            Some(Arc::new(names))
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to load SEC ticker names, using bare tickers"
            );
            None
        }
    }
}

async fn run(config: AppConfig, once: bool) -> Result<(), AppError> {
    let store = AlertStore::open(&config.db_path).await?;
    info!(path = %config.db_path.display(), "Alert database ready");

    let names = load_ticker_names(&config);
    let platforms = Platform::from_settings(&config.platforms, names)?;
    info!(
        platforms = ?platforms.iter().map(Platform::name).collect::<Vec<_>>(),
        timeframes = ?config.pipeline.timeframes.enabled(),
        buffer_hours = config.pipeline.market_hours_buffer,
        "Notification platforms configured"
    );

    let pipeline = AlertPipeline::new(
        NyseCalendar,
        store.clone(),
        platforms,
        config.pipeline.clone(),
    );

    let mailbox = ImapMailbox::connect(&config.imap).await?;
    let mut watcher = Watcher::new(mailbox, pipeline, config.imap.idle_timeout);

    let result = if once {
        watcher.drain().await.map(|_| ())
    } else {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => warn!("Shutdown signal received"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
            }
            let _ = shutdown_tx.send(true);
        });
        info!("Press Ctrl+C to stop...");
        watcher.run(shutdown_rx).await
    };

    let stats = watcher.stats();
    info!(
        messages = stats.messages,
        discarded = stats.discarded,
        tickers_alerted = stats.tickers_alerted,
        failed = stats.failed,
        "Final stats"
    );

    let mut mailbox = watcher.into_mailbox();
    if let Err(e) = mailbox.logout().await {
        warn!(error = %e, "IMAP logout failed");
    }
    store.close().await;

    result.map_err(AppError::from)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = AppConfig::from_env().map(|c| c.with_overrides(args.overrides()));

    let level = match &config {
        Ok(c) => c.log_level.clone(),
        Err(_) => args
            .log_level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
    };
    init_logging(&level);

    info!(version = %VersionInfo::from_env(), "Starting HVC Watch email monitor");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config, args.once).await {
        Ok(()) => {
            info!("HVC Watch stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "HVC Watch stopped with an error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "hvcwatch",
            "--log-level",
            "debug",
            "--db-path",
            "/tmp/alerts.db",
            "--buffer-hours",
            "2",
            "--once",
        ]);
        assert!(args.once);

        let overrides = args.overrides();
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(overrides.db_path, Some(PathBuf::from("/tmp/alerts.db")));
        assert_eq!(overrides.buffer_hours, Some(2));
    }

    #[test]
    fn test_args_default_to_environment() {
        let args = Args::parse_from(["hvcwatch"]);
        assert!(!args.once);

        let overrides = args.overrides();
        assert_eq!(overrides.log_level, None);
        assert_eq!(overrides.db_path, None);
        assert_eq!(overrides.buffer_hours, None);
    }
}
