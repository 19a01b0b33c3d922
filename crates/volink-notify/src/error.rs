/// Errors that can occur within the mail subsystem.
///
/// # Examples
///
/// ```rust
/// use volink_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing smtp_host".to_string());
/// assert!(err.to_string().contains("smtp_host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Mailer configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid mailer configuration: {0}")]
    InvalidConfig(String),

    /// A sender or recipient address failed to parse.
    #[error("Notify: invalid address '{0}'")]
    InvalidAddress(String),

    /// SMTP transport error when sending email.
    #[error("Notify: SMTP error: {0}")]
    SmtpError(String),

    /// The event type has no registered template.
    #[error("Notify: unknown template '{0}'")]
    UnknownTemplate(String),

    /// Rendering a mail template failed (missing payload field, bad value).
    #[error("Notify: template rendering error: {0}")]
    TemplateError(String),
}

/// Convenience `Result` alias for mail operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
