use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use super::{templates, templates::RenderedEmail, Notifier, ReservationNotice};
use crate::config::SmtpConfig;

/// Sends HTML mail through an SMTP relay (STARTTLS).
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    frontend_url: String,
}

impl SmtpNotifier {
    pub fn new(cfg: &SmtpConfig, from: &str, frontend_url: &str) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .context("smtp relay")?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        let from = from.parse().context("parse MAIL_FROM")?;
        Ok(Self {
            transport,
            from,
            frontend_url: frontend_url.to_string(),
        })
    }

    async fn send(&self, to: &str, mail: RenderedEmail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().with_context(|| format!("invalid recipient {to}"))?)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .context("build email")?;
        self.transport
            .send(message)
            .await
            .with_context(|| format!("send email to {to}"))?;
        debug!(%to, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn registration(&self, recipient: &str, username: &str) -> anyhow::Result<()> {
        self.send(recipient, templates::registration(username, &self.frontend_url))
            .await
    }

    async fn reservation_confirmed(&self, notice: &ReservationNotice) -> anyhow::Result<()> {
        self.send(
            &notice.recipient,
            templates::reservation_confirmed(notice, &self.frontend_url),
        )
        .await
    }

    async fn reservation_cancelled(&self, notice: &ReservationNotice) -> anyhow::Result<()> {
        self.send(
            &notice.recipient,
            templates::reservation_cancelled(notice, &self.frontend_url),
        )
        .await
    }
}
