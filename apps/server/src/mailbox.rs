//! Mailbox poller: unseen-message fetch and IDLE waits over IMAP.

use crate::config::ImapSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hvcwatch_core::{InboundMessage, MessageTime};
use imap::types::Fetch;
use std::net::TcpStream;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

type ImapSession = imap::Session<native_tls::TlsStream<TcpStream>>;

#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("IMAP error: {0}")]
    Imap(#[from] imap::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("IMAP worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IMAP session is not connected")]
    Disconnected,
}

/// Source of inbound alert messages.
#[async_trait]
pub trait Mailbox: Send {
    /// Unseen messages, marked seen as they are returned.
    async fn fetch_unseen(&mut self) -> Result<Vec<InboundMessage>, MailboxError>;

    /// Block until the mailbox changes or `timeout` elapses. `true` means new
    /// activity was seen.
    async fn wait_for_activity(&mut self, timeout: Duration) -> Result<bool, MailboxError>;
}

/// Blocking `imap` session driven on tokio's blocking pool.
pub struct ImapMailbox {
    session: Option<ImapSession>,
}

impl ImapMailbox {
    /// Connect over TLS, log in and select the configured folder.
    pub async fn connect(settings: &ImapSettings) -> Result<Self, MailboxError> {
        let settings = settings.clone();
        let session = tokio::task::spawn_blocking(move || {
            let tls = native_tls::TlsConnector::builder().build()?;
            let client = imap::connect(
                (settings.host.as_str(), settings.port),
                settings.host.as_str(),
                &tls,
            )?;
            let mut session = client
                .login(&settings.user, &settings.password)
                .map_err(|(e, _client)| e)?;
            let selected = session.select(&settings.folder)?;
            info!(
                host = %settings.host,
                folder = %settings.folder,
                exists = selected.exists,
                "Connected to IMAP mailbox"
            );
            Ok::<_, MailboxError>(session)
        })
        .await??;

        Ok(Self {
            session: Some(session),
        })
    }

    /// Run `f` against the session on the blocking pool.
    ///
    /// The session is moved into the worker and back; if the worker is lost
    /// the mailbox stays disconnected.
    async fn with_session<T, F>(&mut self, f: F) -> Result<T, MailboxError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ImapSession) -> Result<T, MailboxError> + Send + 'static,
    {
        let mut session = self.session.take().ok_or(MailboxError::Disconnected)?;
        let (session, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut session);
            (session, result)
        })
        .await?;
        self.session = Some(session);
        result
    }

    pub async fn logout(&mut self) -> Result<(), MailboxError> {
        let Some(mut session) = self.session.take() else {
            debug!("IMAP session already gone, skipping logout");
            return Ok(());
        };
        tokio::task::spawn_blocking(move || session.logout()).await??;
        info!("Logged out of IMAP mailbox");
        Ok(())
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn fetch_unseen(&mut self) -> Result<Vec<InboundMessage>, MailboxError> {
        self.with_session(|session| {
            let mut uids: Vec<u32> = session.uid_search("UNSEEN")?.into_iter().collect();
            if uids.is_empty() {
                return Ok(Vec::new());
            }
            uids.sort_unstable();

            let set = uids
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");

            // ENVELOPE doesn't set \Seen, so flag explicitly once read
            let fetches = session.uid_fetch(&set, "(UID ENVELOPE INTERNALDATE)")?;
            let mut messages: Vec<(u32, InboundMessage)> = fetches
                .iter()
                .map(|fetch| (fetch.uid.unwrap_or(0), to_inbound(fetch)))
                .collect();
            messages.sort_by_key(|(uid, _)| *uid);

            session.uid_store(&set, "+FLAGS (\\Seen)")?;

            Ok(messages.into_iter().map(|(_, message)| message).collect())
        })
        .await
    }

    async fn wait_for_activity(&mut self, timeout: Duration) -> Result<bool, MailboxError> {
        self.with_session(move |session| {
            let outcome = session.idle()?.wait_with_timeout(timeout)?;
            Ok(matches!(outcome, imap::extensions::idle::WaitOutcome::MailboxChanged))
        })
        .await
    }
}

fn to_inbound(fetch: &Fetch) -> InboundMessage {
    let envelope = fetch.envelope();

    let subject = envelope
        .and_then(|e| e.subject)
        .map(|raw| String::from_utf8_lossy(raw).into_owned());

    let timestamp = envelope
        .and_then(|e| e.date)
        .and_then(|raw| parse_header_date(&String::from_utf8_lossy(raw)))
        .or_else(|| fetch.internal_date())
        .map(MessageTime::from)
        .unwrap_or_else(|| {
            warn!(uid = ?fetch.uid, "Message has no usable date, using now");
            MessageTime::from(Utc::now())
        });

    InboundMessage::new(subject, timestamp)
}

/// `Date:` header value, ignoring a trailing `(zone comment)`.
fn parse_header_date(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    let trimmed = match raw.find('(') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    DateTime::parse_from_rfc2822(trimmed.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    #[test]
    fn test_parse_header_date() {
        let expected = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 12, 3, 11, 0, 0)
            .unwrap();

        assert_eq!(
            parse_header_date("Tue, 3 Dec 2024 11:00:00 -0500"),
            Some(expected)
        );
        assert_eq!(
            parse_header_date("Tue, 03 Dec 2024 11:00:00 -0500 (EST)"),
            Some(expected)
        );
        assert_eq!(parse_header_date("yesterday"), None);
    }

    #[test]
    fn test_header_date_is_aware() {
        let parsed = parse_header_date("Tue, 3 Dec 2024 16:00:00 +0000").unwrap();
        let time = MessageTime::from(parsed);
        assert_eq!(
            time.date_in(chrono_tz::America::New_York),
            NaiveDate::from_ymd_opt(2024, 12, 3).unwrap()
        );
    }
}
