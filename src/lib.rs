//! Personal Workspace Agent MCP Server
//!
//! This crate provides an MCP server that gives an AI assistant hands-on
//! access to a personal workspace: local files, the host system, crypto
//! market data and an email account. Each capability group can run on its
//! own or all of them together in one process.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 MCP client (desktop assistant, IDE)              │
//! └───────────────────────────┬─────────────────────────────────────┘
//!                             │ MCP Protocol (JSON-RPC over stdio)
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     workspace-agent-mcp                          │
//! │             WorkspaceMcpServer → ToolRegistry                    │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐   │
//! │  │ files      │ │ system     │ │ crypto     │ │ email      │   │
//! │  │ PathGuard  │ │ sysinfo    │ │ reqwest    │ │ IMAP/SMTP  │   │
//! │  └────────────┘ └────────────┘ └────────────┘ └────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # MCP Tools
//!
//! | Group | Tools |
//! |-------|-------|
//! | `files` | `list_directory`, `read_file`, `write_file`, `create_directory`, `delete_file_or_directory`, `get_file_info`, `search_files_by_content`, `find_duplicate_files`, `organize_files_by_type`, `batch_rename_files`, `get_directory_statistics` |
//! | `system` | `get_system_info`, `get_processes`, `get_disk_usage`, `get_network_info`, `get_system_health` |
//! | `crypto` | `get_crypto_price`, `get_top_cryptos`, `search_crypto`, `get_crypto_trending`, `get_crypto_fear_greed` |
//! | `email` | `send_email`, `read_emails`, `get_unread_count`, `mark_as_read`, `search_emails`, `get_email_folders`, `delete_email`, `test_connection` |
//!
//! Each group also serves one resource template: `file://{path}`,
//! `system://{resource}`, `crypto://{symbol}` and `email://{resource}`.

pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod files;
pub mod protocol;
pub mod server;
pub mod system;
pub mod tools;

pub use config::WorkspaceConfig;
pub use error::{Error, Result};
pub use protocol::{McpRequest, McpResponse};
pub use server::WorkspaceMcpServer;
pub use tools::{CapabilityGroup, ServerSelection, ToolContext, ToolRegistry};
