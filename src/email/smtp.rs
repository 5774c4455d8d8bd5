//! SMTP sender over STARTTLS.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{MailSender, OutgoingEmail};
use crate::config::EmailConfig;
use crate::error::{Error, Result};

/// Mail sender backed by an SMTP submission server.
#[derive(Debug, Clone)]
pub struct SmtpSender {
    server: String,
    port: u16,
    credentials: Option<(String, String)>,
}

impl SmtpSender {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            server: config.smtp_server.clone(),
            port: config.smtp_port,
            credentials: config
                .credentials()
                .map(|(a, p)| (a.to_string(), p.to_string())),
        }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let (user, password) = self
            .credentials
            .clone()
            .ok_or_else(|| Error::NotConfigured("Email credentials not configured.".into()))?;

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.server)?
                .port(self.port)
                .credentials(Credentials::new(user, password))
                .build(),
        )
    }
}

/// Build the MIME message. Bcc recipients go to the envelope only.
pub fn build_message(email: &OutgoingEmail) -> Result<Message> {
    let mut builder = Message::builder()
        .from(email.from.parse::<Mailbox>()?)
        .to(email.to.parse::<Mailbox>()?)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for cc in &email.cc {
        builder = builder.cc(cc.parse::<Mailbox>()?);
    }
    for bcc in &email.bcc {
        builder = builder.bcc(bcc.parse::<Mailbox>()?);
    }

    Ok(builder.body(email.body.clone())?)
}

#[async_trait]
impl MailSender for SmtpSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(email)?;
        let transport = self.transport()?;
        transport.send(message).await?;
        info!(
            "Sent email to {} (+{} cc, +{} bcc)",
            email.to,
            email.cc.len(),
            email.bcc.len()
        );
        Ok(())
    }

    async fn check(&self) -> Result<()> {
        if self.transport()?.test_connection().await? {
            Ok(())
        } else {
            Err(Error::Upstream(format!(
                "SMTP server {}:{} refused the connection",
                self.server, self.port
            )))
        }
    }
}
