use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Outbound email seam for the confirmation flow.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()>;
}

/// SMTP delivery when `SMTP_URL` is set, otherwise [`LogMailer`].
pub fn from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.smtp_url.as_deref() {
        Some(url) => {
            let mailer = SmtpMailer::new(url, &config.mail_from)?;
            info!("verification mail goes over SMTP");
            Ok(Arc::new(mailer))
        }
        None => {
            warn!("SMTP_URL not set; verification mail will not be delivered");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(url: &str, from: &str) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(url)
            .context("parse SMTP_URL")?
            .build();
        let from = from.parse::<Mailbox>().context("parse MAIL_FROM")?;
        Ok(Self { transport, from })
    }

    fn verification_message(&self, to: &str, link: &str) -> anyhow::Result<Message> {
        let to = to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {to}"))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Confirm your email")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Welcome!\n\nOpen this link to confirm your email address:\n\n{link}\n\n\
                 If you did not sign up, ignore this message.\n"
            ))
            .context("build verification email")
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()> {
        let message = self.verification_message(to, link)?;
        let response = self
            .transport
            .send(message)
            .await
            .context("send verification email")?;
        debug!(code = %response.code(), "smtp accepted verification email");
        Ok(())
    }
}

/// Fallback when no SMTP server is configured. The link is a bearer
/// credential, so it only appears at debug level.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()> {
        info!(to = %to, "verification email not delivered, no SMTP configured");
        debug!(to = %to, link = %link, "verification link");
        Ok(())
    }
}

#[cfg(test)]
pub use recording::RecordingMailer;
