//! IMAP-over-TLS mail store.

use std::net::TcpStream;

use async_trait::async_trait;
use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, warn};

use super::{FetchedMessage, MailFlag, MailStore, SearchQuery};
use crate::config::EmailConfig;
use crate::error::{Error, Result};

type ImapSession = imap::Session<TlsStream<TcpStream>>;

/// Mail store backed by an IMAP server.
///
/// The `imap` crate is blocking, so each call runs on the blocking pool with
/// its own session, logged out when the call ends.
#[derive(Debug, Clone)]
pub struct ImapStore {
    server: String,
    port: u16,
    credentials: Option<(String, String)>,
}

impl ImapStore {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            server: config.imap_server.clone(),
            port: config.imap_port,
            credentials: config
                .credentials()
                .map(|(a, p)| (a.to_string(), p.to_string())),
        }
    }

    fn session(&self) -> Result<ImapSession> {
        let (user, password) = self
            .credentials
            .as_ref()
            .ok_or_else(|| Error::NotConfigured("Email credentials not configured.".into()))?;

        let tls = TlsConnector::builder().build()?;
        let client = imap::connect((self.server.as_str(), self.port), &self.server, &tls)?;
        debug!("IMAP connected to {}:{}", self.server, self.port);
        client.login(user, password).map_err(|(e, _)| Error::from(e))
    }

    async fn with_session<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ImapSession) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut session = store.session()?;
            let out = f(&mut session);
            if let Err(e) = session.logout() {
                warn!("IMAP logout failed: {}", e);
            }
            out
        })
        .await?
    }
}

#[async_trait]
impl MailStore for ImapStore {
    async fn list_folders(&self) -> Result<Vec<String>> {
        self.with_session(|session| {
            let names = session.list(Some(""), Some("*"))?;
            Ok(names.iter().map(|n| n.name().to_string()).collect())
        })
        .await
    }

    async fn search(&self, folder: &str, query: &SearchQuery) -> Result<Vec<u32>> {
        let folder = folder.to_string();
        let query = query.to_imap();
        self.with_session(move |session| {
            session.select(&folder)?;
            let mut ids: Vec<u32> = session.search(&query)?.into_iter().collect();
            ids.sort_unstable();
            Ok(ids)
        })
        .await
    }

    async fn fetch(&self, folder: &str, ids: &[u32]) -> Result<Vec<FetchedMessage>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let folder = folder.to_string();
        let wanted = ids.to_vec();
        self.with_session(move |session| {
            session.select(&folder)?;
            let set = wanted
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            // PEEK keeps the \Seen flag untouched; marking read is its own tool.
            let fetches = session.fetch(set, "BODY.PEEK[]")?;
            let mut messages: Vec<FetchedMessage> = fetches
                .iter()
                .filter_map(|f| {
                    f.body().map(|body| FetchedMessage {
                        id: f.message,
                        raw: body.to_vec(),
                    })
                })
                .collect();
            messages.sort_by_key(|m| wanted.iter().position(|id| *id == m.id));
            Ok(messages)
        })
        .await
    }

    async fn add_flag(&self, folder: &str, id: u32, flag: MailFlag) -> Result<()> {
        let folder = folder.to_string();
        self.with_session(move |session| {
            session.select(&folder)?;
            session.store(id.to_string(), format!("+FLAGS ({})", flag.as_imap()))?;
            if flag == MailFlag::Deleted {
                session.expunge()?;
            }
            Ok(())
        })
        .await
    }

    async fn check(&self) -> Result<()> {
        self.with_session(|_| Ok(())).await
    }
}
