//! Notification channel seams.
//!
//! Email and SMS delivery sit behind traits; the default implementations log
//! the message instead of calling a provider.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct SendError(pub String);

/// Outbound email channel.
pub trait Mailer: Send + Sync {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

/// Outbound SMS channel.
pub trait SmsGateway: Send + Sync {
    fn send_sms(&self, to: &str, body: &str) -> Result<(), SendError>;
}

/// Mailer that writes the message to the log stream.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        info!(to, subject, body, "email sent");
        Ok(())
    }
}

/// SMS gateway that writes the message to the log stream.
pub struct LogSmsGateway;

impl SmsGateway for LogSmsGateway {
    fn send_sms(&self, to: &str, body: &str) -> Result<(), SendError> {
        info!(to, body, "sms sent");
        Ok(())
    }
}
