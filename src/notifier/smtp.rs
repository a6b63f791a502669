use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use super::{Notifier, NotifyError};
use crate::config::MailConfig;

/// Sends mail through an SMTP relay using STARTTLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let from_address: Address = config
            .from_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid from address '{}': {e}", config.from_address))?;
        let from = Mailbox::new(Some(config.from_name.clone()), from_address);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| anyhow::anyhow!("Failed to create SMTP transport: {e}"))?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn build_message(
    from: &Mailbox,
    to: &str,
    subject: &str,
    html_body: &str,
) -> Result<Message, NotifyError> {
    let to_address: Address = to.parse().map_err(|e: lettre::address::AddressError| {
        NotifyError::InvalidAddress {
            address: to.to_string(),
            reason: e.to_string(),
        }
    })?;

    Message::builder()
        .from(from.clone())
        .to(Mailbox::new(None, to_address))
        .subject(subject)
        .multipart(MultiPart::alternative_plain_html(
            super::template::plain_text(html_body),
            html_body.to_string(),
        ))
        .map_err(|e| NotifyError::Message(e.to_string()))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        let message = build_message(&self.from, to, subject, html_body)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        tracing::info!(to = %to, "Email sent");
        Ok(())
    }
}
