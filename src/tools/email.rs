//! Email tools.

use std::fmt::Write;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, reported, Tool, ToolContext};
use crate::email::{EmailSummary, MessageOutcome};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};

pub(super) fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SendEmailTool),
        Arc::new(ReadEmailsTool),
        Arc::new(UnreadCountTool),
        Arc::new(MarkAsReadTool),
        Arc::new(SearchEmailsTool),
        Arc::new(FoldersTool),
        Arc::new(DeleteEmailTool),
        Arc::new(TestConnectionTool),
    ]
}

const DOUBLE_RULE: usize = 60;
const RULE: usize = 40;

fn default_folder() -> String {
    "INBOX".into()
}

fn default_limit() -> usize {
    10
}

fn folder_schema() -> Value {
    json!({ "type": "string", "description": "Mailbox folder", "default": "INBOX" })
}

/// Tool sending a plain-text email.
pub struct SendEmailTool;

#[derive(Debug, Deserialize)]
struct SendArgs {
    to: String,
    subject: String,
    body: String,
    #[serde(default)]
    cc: String,
    #[serde(default)]
    bcc: String,
}

#[async_trait::async_trait]
impl Tool for SendEmailTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "send_email".into(),
            description: "Send a plain-text email.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Recipient address" },
                    "subject": { "type": "string", "description": "Subject line" },
                    "body": { "type": "string", "description": "Message body" },
                    "cc": { "type": "string", "description": "Comma-separated CC addresses", "default": "" },
                    "bcc": { "type": "string", "description": "Comma-separated BCC addresses", "default": "" }
                },
                "required": ["to", "subject", "body"]
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: SendArgs = parse_args(arguments)?;
        let sent = context
            .email
            .send(&args.to, &args.subject, &args.body, &args.cc, &args.bcc)
            .await
            .map(|_| ToolCallResult::text(format!("✅ Email sent successfully to {}", args.to)));
        reported(sent, "Error sending email")
    }
}

/// Tool reading the newest messages of a folder.
pub struct ReadEmailsTool;

#[derive(Debug, Deserialize)]
struct ReadArgs {
    #[serde(default = "default_folder")]
    folder: String,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    unread_only: bool,
}

#[async_trait::async_trait]
impl Tool for ReadEmailsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "read_emails".into(),
            description: "Read the most recent emails of a folder, newest first.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "folder": folder_schema(),
                    "limit": { "type": "integer", "minimum": 1, "description": "Number of emails", "default": 10 },
                    "unread_only": { "type": "boolean", "description": "Only unread emails", "default": false }
                }
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: ReadArgs = parse_args(arguments)?;
        let unread = if args.unread_only { "unread " } else { "" };
        let read = context
            .email
            .read(&args.folder, args.limit, args.unread_only)
            .await
            .map(|messages| {
                if messages.is_empty() {
                    return ToolCallResult::text(format!(
                        "📧 No {}emails in {}",
                        unread, args.folder
                    ));
                }
                let mut text = format!(
                    "📧 Recent {} {}emails from {}:\n{}\n\n",
                    messages.len(),
                    unread,
                    args.folder,
                    "=".repeat(DOUBLE_RULE)
                );
                for message in &messages {
                    render_message(&mut text, message, true);
                }
                ToolCallResult::text(text.trim_end())
            });
        reported(read, "Error reading emails")
    }
}

fn render_message(out: &mut String, message: &MessageOutcome, full: bool) {
    match message {
        MessageOutcome::Parsed(summary) => render_summary(out, summary, full),
        MessageOutcome::Failed { id, reason } => {
            let _ = write!(out, "⚠️ Error processing email {}: {}\n\n", id, reason);
        }
    }
}

fn render_summary(out: &mut String, summary: &EmailSummary, full: bool) {
    let _ = writeln!(out, "📨 Email ID: {}", summary.id);
    let _ = writeln!(out, "From: {}", summary.from);
    if full {
        let _ = writeln!(out, "To: {}", summary.to);
    }
    let _ = writeln!(out, "Subject: {}", summary.subject);
    let _ = writeln!(out, "Date: {}", summary.date);
    if full {
        if let Some(preview) = &summary.preview {
            let _ = writeln!(out, "Preview: {}...", preview);
        }
    }
    let _ = write!(out, "{}\n\n", "-".repeat(RULE));
}

/// Tool counting unseen messages.
pub struct UnreadCountTool;

#[derive(Debug, Deserialize)]
struct FolderArgs {
    #[serde(default = "default_folder")]
    folder: String,
}

#[async_trait::async_trait]
impl Tool for UnreadCountTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_unread_count".into(),
            description: "Get the number of unread emails in a folder.".into(),
            input_schema: json!({
                "type": "object",
                "properties": { "folder": folder_schema() }
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: FolderArgs = parse_args(arguments)?;
        let count = context.email.unread_count(&args.folder).await.map(|n| {
            ToolCallResult::text(format!("📊 {}: {} unread email(s)", args.folder, n))
        });
        reported(count, "Error getting unread count")
    }
}

#[derive(Debug, Deserialize)]
struct MessageArgs {
    email_id: String,
    #[serde(default = "default_folder")]
    folder: String,
}

fn message_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "email_id": { "type": "string", "description": "Message sequence number" },
            "folder": folder_schema()
        },
        "required": ["email_id"]
    })
}

/// Tool flagging a message as seen.
pub struct MarkAsReadTool;

#[async_trait::async_trait]
impl Tool for MarkAsReadTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "mark_as_read".into(),
            description: "Mark an email as read.".into(),
            input_schema: message_schema(),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: MessageArgs = parse_args(arguments)?;
        let marked = context
            .email
            .mark_read(&args.folder, &args.email_id)
            .await
            .map(|id| ToolCallResult::text(format!("✅ Email {} marked as read", id)));
        reported(marked, "Error marking email as read")
    }
}

/// Tool deleting a message.
pub struct DeleteEmailTool;

#[async_trait::async_trait]
impl Tool for DeleteEmailTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "delete_email".into(),
            description: "Delete an email and expunge it from the folder.".into(),
            input_schema: message_schema(),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: MessageArgs = parse_args(arguments)?;
        let deleted = context
            .email
            .delete(&args.folder, &args.email_id)
            .await
            .map(|id| {
                ToolCallResult::text(format!(
                    "✅ Email {} deleted successfully from {}",
                    id, args.folder
                ))
            });
        reported(deleted, "Error deleting email")
    }
}

/// Tool searching subjects.
pub struct SearchEmailsTool;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_folder")]
    folder: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

#[async_trait::async_trait]
impl Tool for SearchEmailsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_emails".into(),
            description: "Search emails by subject.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to look for in the subject" },
                    "folder": folder_schema(),
                    "limit": { "type": "integer", "minimum": 1, "description": "Number of matches to show", "default": 10 }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: SearchArgs = parse_args(arguments)?;
        let found = context
            .email
            .search(&args.folder, &args.query, args.limit)
            .await
            .map(|outcome| {
                if outcome.total == 0 {
                    return ToolCallResult::text(format!(
                        "No emails found matching '{}' in {}",
                        args.query, args.folder
                    ));
                }
                let mut text = format!(
                    "🔍 Search results for '{}' in {} ({} total matches):\n{}\n\n",
                    args.query,
                    args.folder,
                    outcome.total,
                    "=".repeat(DOUBLE_RULE)
                );
                for message in &outcome.messages {
                    render_message(&mut text, message, false);
                }
                ToolCallResult::text(text.trim_end())
            });
        reported(found, "Error searching emails")
    }
}

/// Tool listing mailbox folders.
pub struct FoldersTool;

#[async_trait::async_trait]
impl Tool for FoldersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_email_folders".into(),
            description: "List available email folders.".into(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let folders = context.email.folders().await.map(|names| {
            let mut text = format!("📁 Available Email Folders:\n{}\n", "=".repeat(RULE));
            for name in &names {
                let _ = write!(text, "\n📂 {}", name);
            }
            ToolCallResult::text(text)
        });
        reported(folders, "Error getting folders")
    }
}

/// Tool probing SMTP and IMAP.
pub struct TestConnectionTool;

#[async_trait::async_trait]
impl Tool for TestConnectionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "test_connection".into(),
            description: "Test the SMTP and IMAP connections with the configured credentials."
                .into(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let report = context.email.test_connection().await;
        Ok(ToolCallResult::text(report.render()))
    }
}
