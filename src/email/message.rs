//! Parsing fetched messages into summaries.

use mailparse::{MailHeaderMap, ParsedMail};

use crate::error::Result;

/// Characters of body text kept as a preview.
pub const PREVIEW_CHARS: usize = 200;

/// Headline fields of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailSummary {
    pub id: u32,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    /// Start of the first text/plain part, if any.
    pub preview: Option<String>,
}

/// Parse a raw RFC 822 message.
pub fn summarize(id: u32, raw: &[u8]) -> Result<EmailSummary> {
    let parsed = mailparse::parse_mail(raw)?;
    let header = |name: &str, default: &str| {
        parsed
            .headers
            .get_first_value(name)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    Ok(EmailSummary {
        id,
        from: header("From", "Unknown"),
        to: header("To", "Unknown"),
        subject: header("Subject", "No Subject"),
        date: header("Date", "Unknown"),
        preview: preview(&parsed),
    })
}

fn preview(mail: &ParsedMail) -> Option<String> {
    let body = if mail.subparts.is_empty() {
        mail.get_body().ok()?
    } else {
        first_plain_text(mail)?
    };
    let text: String = body.trim().chars().take(PREVIEW_CHARS).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_plain_text(mail: &ParsedMail) -> Option<String> {
    if mail.subparts.is_empty() {
        if mail.ctype.mimetype == "text/plain" {
            return mail.get_body().ok();
        }
        return None;
    }
    mail.subparts.iter().find_map(first_plain_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_simple_message() {
        let raw = b"From: Alice <alice@example.org>\r\n\
To: bob@example.org\r\n\
Subject: Lunch?\r\n\
Date: Mon, 1 Jan 2024 12:00:00 +0000\r\n\
\r\n\
Are you free at noon?\r\n";
        let summary = summarize(7, raw).unwrap();
        assert_eq!(summary.id, 7);
        assert_eq!(summary.from, "Alice <alice@example.org>");
        assert_eq!(summary.subject, "Lunch?");
        assert_eq!(summary.preview.as_deref(), Some("Are you free at noon?"));
    }

    #[test]
    fn test_summarize_defaults_and_multipart() {
        let raw = b"Content-Type: multipart/alternative; boundary=\"XX\"\r\n\
\r\n\
--XX\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>html body</p>\r\n\
--XX\r\n\
Content-Type: text/plain\r\n\
\r\n\
plain body\r\n\
--XX--\r\n";
        let summary = summarize(1, raw).unwrap();
        assert_eq!(summary.from, "Unknown");
        assert_eq!(summary.subject, "No Subject");
        assert_eq!(summary.date, "Unknown");
        assert_eq!(summary.preview.as_deref(), Some("plain body"));
    }

    #[test]
    fn test_preview_is_truncated() {
        let body = "x".repeat(500);
        let raw = format!("Subject: long\r\n\r\n{}", body);
        let summary = summarize(2, raw.as_bytes()).unwrap();
        assert_eq!(summary.preview.unwrap().len(), PREVIEW_CHARS);
    }
}
