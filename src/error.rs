//! Error types for workspace-agent-mcp.

use thiserror::Error;

/// Result type for workspace-agent-mcp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for workspace-agent-mcp.
#[derive(Debug, Error)]
pub enum Error {
    /// Path or remote object does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The target exists but the operation cannot handle it.
    #[error("{0}")]
    Unsupported(String),

    /// Invalid parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A capability is missing the settings it needs (credentials, endpoints).
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// An upstream service answered, but not with something usable.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file parse error.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Bad rename pattern.
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IMAP error.
    #[error("IMAP error: {0}")]
    Imap(#[from] imap::Error),

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Outgoing message could not be built.
    #[error("message error: {0}")]
    Message(#[from] lettre::error::Error),

    /// Mail address could not be parsed.
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Incoming message could not be parsed.
    #[error("mail parse error: {0}")]
    MailParse(#[from] mailparse::MailParseError),
}

impl Error {
    /// Whether the error came from the caller's arguments rather than the tool's work.
    ///
    /// Argument errors are reported as JSON-RPC errors; everything else becomes
    /// a tool result flagged `isError`.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidParams(_))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("blocking task failed: {}", err))
    }
}
