//! Outbound messages to patients.
//!
//! The core hands over a finished message and learns only whether the hand-off
//! worked. Nothing here retries.

pub mod smtp;
pub mod template;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::MailConfig;

pub use smtp::SmtpNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Delivery failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an HTML message to `to`.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError>;
}

/// Logs the envelope of each message instead of sending it. Used when mail is
/// disabled. Bodies carry reset codes and are never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        tracing::warn!(
            to = %to,
            subject = %subject,
            body_bytes = html_body.len(),
            "Mail disabled; message dropped"
        );
        Ok(())
    }
}

pub fn from_config(config: &MailConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    if config.enabled {
        tracing::info!(
            "SMTP notifier configured for {}:{}",
            config.smtp_host,
            config.smtp_port
        );
        Ok(Arc::new(SmtpNotifier::new(config)?))
    } else {
        tracing::warn!("Mail is disabled; reset codes will not be delivered");
        Ok(Arc::new(LogNotifier))
    }
}
