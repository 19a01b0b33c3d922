use async_trait::async_trait;

use crate::error::Result;
use crate::Mailer;

/// Development fallback used when no `[smtp]` section is configured.
/// Deliveries are written to the log instead of the wire, so flows that
/// depend on outbound mail (OTP login in particular) stay usable locally.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        tracing::warn!(
            recipient = %to,
            subject = %subject,
            body = %body,
            "SMTP disabled, logging mail instead of sending"
        );
        Ok(())
    }

    fn mailer_type(&self) -> &str {
        "log"
    }
}
