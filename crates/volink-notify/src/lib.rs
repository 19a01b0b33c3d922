//! Transactional email delivery for the matchmaking service.
//!
//! Application events (new application, review decisions, registrations)
//! and the OTP login flow all go out through a [`Mailer`]. Production uses
//! [`mailers::SmtpMailer`]; deployments without SMTP configuration fall back
//! to [`mailers::LogMailer`], and tests capture deliveries with
//! [`mailers::MemoryMailer`]. Message content is produced by the typed
//! template table in [`templates`].

pub mod error;
pub mod mailers;
pub mod templates;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

use crate::error::Result;

/// An outbound mail transport.
///
/// Delivery is always one recipient per call; callers treat a failed send as
/// a logged side effect, never as a reason to fail the triggering operation.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one plain-text message.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;

    /// Returns the transport name (e.g., `"smtp"`, `"log"`).
    fn mailer_type(&self) -> &str;
}
