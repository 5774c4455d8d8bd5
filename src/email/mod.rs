//! Email capability.
//!
//! [`EmailService`] implements the mailbox operations on top of two seams:
//! [`MailStore`] (reading and flagging) and [`MailSender`] (delivery). The
//! production pair is [`ImapStore`] + [`SmtpSender`].

mod imap_store;
mod message;
mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::error::{Error, Result};

pub use imap_store::ImapStore;
pub use message::{summarize, EmailSummary, PREVIEW_CHARS};
pub use smtp::{build_message, SmtpSender};

/// IMAP search criteria the tools use.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    All,
    Unseen,
    Subject(String),
}

impl SearchQuery {
    /// IMAP SEARCH syntax, with the subject quoted and escaped.
    pub fn to_imap(&self) -> String {
        match self {
            SearchQuery::All => "ALL".into(),
            SearchQuery::Unseen => "UNSEEN".into(),
            SearchQuery::Subject(s) => {
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                format!("SUBJECT \"{}\"", escaped)
            }
        }
    }
}

/// Flags the tools set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailFlag {
    Seen,
    /// Deleted and expunged.
    Deleted,
}

impl MailFlag {
    pub fn as_imap(&self) -> &'static str {
        match self {
            MailFlag::Seen => "\\Seen",
            MailFlag::Deleted => "\\Deleted",
        }
    }
}

/// Raw message bytes keyed by sequence number.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub id: u32,
    pub raw: Vec<u8>,
}

/// A message ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mailbox access.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// All folder names.
    async fn list_folders(&self) -> Result<Vec<String>>;

    /// Sequence numbers matching `query` in `folder`, ascending.
    async fn search(&self, folder: &str, query: &SearchQuery) -> Result<Vec<u32>>;

    /// Raw messages for `ids`, in the order given. Missing ids are omitted.
    async fn fetch(&self, folder: &str, ids: &[u32]) -> Result<Vec<FetchedMessage>>;

    /// Set a flag on one message.
    async fn add_flag(&self, folder: &str, id: u32, flag: MailFlag) -> Result<()>;

    /// Connect and authenticate without doing anything else.
    async fn check(&self) -> Result<()>;
}

/// Mail delivery.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;

    /// Connect and authenticate without sending.
    async fn check(&self) -> Result<()>;
}

/// A fetched message, or why it could not be summarized.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Parsed(EmailSummary),
    Failed { id: u32, reason: String },
}

/// Matches for a subject search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// All matches, before the limit.
    pub total: usize,
    pub messages: Vec<MessageOutcome>,
}

/// Result of probing both transports.
#[derive(Debug)]
pub struct ConnectionReport {
    pub smtp: Result<()>,
    pub imap: Result<()>,
}

impl ConnectionReport {
    pub fn render(&self) -> String {
        let line = |label: &str, result: &Result<()>| match result {
            Ok(()) => format!("✅ {} connection successful", label),
            Err(e) => format!("❌ {} connection failed: {}", label, e),
        };
        format!("{}\n{}", line("SMTP", &self.smtp), line("IMAP", &self.imap))
    }
}

/// Mailbox operations exposed by the email tools.
#[derive(Clone)]
pub struct EmailService {
    store: Arc<dyn MailStore>,
    sender: Arc<dyn MailSender>,
    address: Option<String>,
    configured: bool,
}

impl EmailService {
    /// Service over IMAP and SMTP from config.
    pub fn from_config(config: &EmailConfig) -> Self {
        Self {
            store: Arc::new(ImapStore::new(config)),
            sender: Arc::new(SmtpSender::new(config)),
            address: config.address.clone(),
            configured: config.credentials().is_some(),
        }
    }

    /// Service over arbitrary backends, treated as configured.
    pub fn new(
        store: Arc<dyn MailStore>,
        sender: Arc<dyn MailSender>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sender,
            address: Some(address.into()),
            configured: true,
        }
    }

    fn require_credentials(&self) -> Result<&str> {
        match (&self.address, self.configured) {
            (Some(address), true) => Ok(address),
            _ => Err(Error::NotConfigured(
                "Email credentials not configured. Set EMAIL_ADDRESS and EMAIL_PASSWORD.".into(),
            )),
        }
    }

    /// Send a plain-text email. `cc`/`bcc` are comma-separated.
    pub async fn send(&self, to: &str, subject: &str, body: &str, cc: &str, bcc: &str) -> Result<()> {
        let from = self.require_credentials()?.to_string();
        let email = OutgoingEmail {
            from,
            to: to.trim().to_string(),
            cc: split_addresses(cc),
            bcc: split_addresses(bcc),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        self.sender.send(&email).await
    }

    /// Newest `limit` messages of `folder`, newest first.
    pub async fn read(&self, folder: &str, limit: usize, unread_only: bool) -> Result<Vec<MessageOutcome>> {
        self.require_credentials()?;
        let query = if unread_only {
            SearchQuery::Unseen
        } else {
            SearchQuery::All
        };
        let ids = self.store.search(folder, &query).await?;
        let newest = newest_first(&ids, limit);
        debug!("Reading {} of {} messages from {}", newest.len(), ids.len(), folder);
        self.summaries(folder, &newest).await
    }

    /// Number of unseen messages in `folder`.
    pub async fn unread_count(&self, folder: &str) -> Result<usize> {
        self.require_credentials()?;
        Ok(self.store.search(folder, &SearchQuery::Unseen).await?.len())
    }

    /// Mark one message read. Returns the parsed id.
    pub async fn mark_read(&self, folder: &str, email_id: &str) -> Result<u32> {
        self.require_credentials()?;
        let id = parse_id(email_id)?;
        self.store.add_flag(folder, id, MailFlag::Seen).await?;
        Ok(id)
    }

    /// Delete and expunge one message. Returns the parsed id.
    pub async fn delete(&self, folder: &str, email_id: &str) -> Result<u32> {
        self.require_credentials()?;
        let id = parse_id(email_id)?;
        self.store.add_flag(folder, id, MailFlag::Deleted).await?;
        info!("Deleted message {} from {}", id, folder);
        Ok(id)
    }

    /// Subject search, newest `limit` matches first.
    pub async fn search(&self, folder: &str, query: &str, limit: usize) -> Result<SearchOutcome> {
        self.require_credentials()?;
        let ids = self
            .store
            .search(folder, &SearchQuery::Subject(query.to_string()))
            .await?;
        let newest = newest_first(&ids, limit);
        Ok(SearchOutcome {
            total: ids.len(),
            messages: self.summaries(folder, &newest).await?,
        })
    }

    /// All folder names.
    pub async fn folders(&self) -> Result<Vec<String>> {
        self.require_credentials()?;
        self.store.list_folders().await
    }

    /// Probe SMTP and IMAP concurrently.
    pub async fn test_connection(&self) -> ConnectionReport {
        let (smtp, imap) = futures::join!(self.sender.check(), self.store.check());
        ConnectionReport { smtp, imap }
    }

    async fn summaries(&self, folder: &str, ids: &[u32]) -> Result<Vec<MessageOutcome>> {
        let fetched = self.store.fetch(folder, ids).await?;
        Ok(fetched
            .into_iter()
            .map(|m| match summarize(m.id, &m.raw) {
                Ok(summary) => MessageOutcome::Parsed(summary),
                Err(e) => MessageOutcome::Failed {
                    id: m.id,
                    reason: e.to_string(),
                },
            })
            .collect())
    }
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("address", &self.address)
            .field("configured", &self.configured)
            .finish_non_exhaustive()
    }
}

/// Text of the `email://{resource}` resource.
pub fn describe_resource(resource: &str) -> String {
    format!("Email resource: {}", resource)
}

fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The last `limit` ids, reversed. A zero limit still returns one.
fn newest_first(ids: &[u32], limit: usize) -> Vec<u32> {
    let limit = limit.max(1);
    let start = ids.len().saturating_sub(limit);
    ids[start..].iter().rev().copied().collect()
}

fn parse_id(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidParams(format!(
            "email_id must be a positive integer, got '{}'",
            raw
        ))),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{MemorySender, MemoryStore};
    use super::*;

    fn inbox() -> MemoryStore {
        MemoryStore::default()
            .with_message("INBOX", 1, "Invoice March", true)
            .with_message("INBOX", 2, "Team lunch", false)
            .with_message("INBOX", 3, "Invoice April", false)
            .with_message("Archive", 9, "Old", true)
    }

    fn service(store: Arc<MemoryStore>, sender: Arc<MemorySender>) -> EmailService {
        EmailService::new(store, sender, "me@example.org")
    }

    #[test]
    fn test_search_query_escaping() {
        assert_eq!(SearchQuery::Unseen.to_imap(), "UNSEEN");
        assert_eq!(
            SearchQuery::Subject(r#"say "hi" \o/"#.into()).to_imap(),
            r#"SUBJECT "say \"hi\" \\o/""#
        );
    }

    #[test]
    fn test_newest_first() {
        assert_eq!(newest_first(&[1, 2, 3, 4], 2), vec![4, 3]);
        assert_eq!(newest_first(&[1, 2], 10), vec![2, 1]);
        assert_eq!(newest_first(&[1, 2], 0), vec![2]);
        assert!(newest_first(&[], 5).is_empty());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(" 42 ").unwrap(), 42);
        assert!(parse_id("0").unwrap_err().is_caller_error());
        assert!(parse_id("abc").is_err());
    }

    #[tokio::test]
    async fn test_read_newest_first_and_unread_filter() {
        let svc = service(Arc::new(inbox()), Arc::new(MemorySender::default()));

        let all = svc.read("INBOX", 2, false).await.unwrap();
        let ids: Vec<u32> = all
            .iter()
            .map(|m| match m {
                MessageOutcome::Parsed(s) => s.id,
                MessageOutcome::Failed { id, .. } => *id,
            })
            .collect();
        assert_eq!(ids, vec![3, 2]);

        let unread = svc.read("INBOX", 10, true).await.unwrap();
        assert_eq!(unread.len(), 2);
        assert_eq!(svc.unread_count("INBOX").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_and_delete() {
        let store = Arc::new(inbox());
        let svc = service(store.clone(), Arc::new(MemorySender::default()));

        assert_eq!(svc.mark_read("INBOX", "2").await.unwrap(), 2);
        assert_eq!(store.seen("INBOX", 2), Some(true));
        assert_eq!(svc.unread_count("INBOX").await.unwrap(), 1);

        svc.delete("INBOX", "3").await.unwrap();
        assert_eq!(store.seen("INBOX", 3), None);
        assert!(svc.mark_read("INBOX", "-1").await.is_err());
    }

    #[tokio::test]
    async fn test_subject_search_reports_total() {
        let svc = service(Arc::new(inbox()), Arc::new(MemorySender::default()));
        let outcome = svc.search("INBOX", "Invoice", 1).await.unwrap();
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.messages.len(), 1);
        match &outcome.messages[0] {
            MessageOutcome::Parsed(s) => assert_eq!(s.subject, "Invoice April"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_splits_recipients() {
        let sender = Arc::new(MemorySender::default());
        let svc = service(Arc::new(MemoryStore::default()), sender.clone());
        svc.send("you@example.org", "Hi", "Body", "a@x.org, ,b@x.org", "")
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "me@example.org");
        assert_eq!(sent[0].cc, vec!["a@x.org", "b@x.org"]);
        assert!(sent[0].bcc.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_service_refuses() {
        let svc = EmailService::from_config(&EmailConfig::default());
        let err = svc.folders().await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
        assert!(err.to_string().contains("credentials not configured"));
    }

    #[tokio::test]
    async fn test_connection_report() {
        let store = MemoryStore {
            fail_check: true,
            ..Default::default()
        };
        let svc = service(Arc::new(store), Arc::new(MemorySender::default()));
        let text = svc.test_connection().await.render();
        assert!(text.contains("✅ SMTP connection successful"));
        assert!(text.contains("❌ IMAP connection failed: upstream error: login rejected"));
    }

    #[tokio::test]
    async fn test_connection_without_credentials_fails_both() {
        let svc = EmailService::from_config(&EmailConfig::default());
        let report = svc.test_connection().await;
        assert!(matches!(report.smtp, Err(Error::NotConfigured(_))));
        assert!(matches!(report.imap, Err(Error::NotConfigured(_))));

        let text = report.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("❌ SMTP connection failed: not configured"));
        assert!(lines[1].starts_with("❌ IMAP connection failed: not configured"));
    }
}
