//! Typed template table for transactional mail.
//!
//! Every outbound message is keyed by an event type string and rendered from
//! a JSON payload, so the generic send endpoint and the internal event hooks
//! share one rendering path.

use serde_json::Value;
use volink_common::types::ApplicationStatus;

use crate::error::{NotifyError, Result};

/// Event types with a registered template.
pub const EVENT_OTP_CODE: &str = "otp_code";
pub const EVENT_APPLICATION_RECEIVED: &str = "application_received";
pub const EVENT_APPLICATION_STATUS: &str = "application_status";
pub const EVENT_REGISTRATION_RECEIVED: &str = "registration_received";
pub const EVENT_REGISTRATION_STATUS: &str = "registration_status";

fn require<'a>(data: &'a Value, key: &str) -> Result<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NotifyError::TemplateError(format!("missing field '{key}'")))
}

fn require_status(data: &Value) -> Result<ApplicationStatus> {
    require(data, "status")?
        .parse::<ApplicationStatus>()
        .map_err(NotifyError::TemplateError)
}

/// Renders `(subject, plain-text body)` for the given event type.
///
/// # Errors
///
/// [`NotifyError::UnknownTemplate`] for unregistered event types,
/// [`NotifyError::TemplateError`] when the payload is missing a required
/// field or carries an invalid status.
pub fn render_event(event_type: &str, data: &Value) -> Result<(String, String)> {
    match event_type {
        EVENT_OTP_CODE => {
            let code = require(data, "code")?;
            let minutes = data
                .get("expires_minutes")
                .and_then(Value::as_u64)
                .unwrap_or(5);
            Ok((
                "Your login code".to_string(),
                format!(
                    "Your one-time login code is {code}.\n\n\
                     It expires in {minutes} minutes and can be used once.\n\
                     If you did not request this code, you can ignore this email."
                ),
            ))
        }
        EVENT_APPLICATION_RECEIVED => {
            let volunteer = require(data, "volunteer_name")?;
            let campaign = require(data, "campaign_title")?;
            Ok((
                format!("New application for \"{campaign}\""),
                format!(
                    "{volunteer} has applied to your campaign \"{campaign}\".\n\n\
                     Sign in to review the application."
                ),
            ))
        }
        EVENT_APPLICATION_STATUS => {
            let campaign = require(data, "campaign_title")?;
            let status = require_status(data)?;
            let (subject, line) = match status {
                ApplicationStatus::Approved => (
                    format!("You're in: \"{campaign}\""),
                    "has been approved. Congratulations!".to_string(),
                ),
                ApplicationStatus::Rejected => (
                    format!("Update on \"{campaign}\""),
                    "was not selected this time. Thank you for applying, and please \
                     keep an eye out for other opportunities."
                        .to_string(),
                ),
                ApplicationStatus::Pending => (
                    format!("Update on \"{campaign}\""),
                    "is back under review.".to_string(),
                ),
            };
            Ok((
                subject,
                format!("Your application for \"{campaign}\" {line}"),
            ))
        }
        EVENT_REGISTRATION_RECEIVED => {
            let volunteer = require(data, "volunteer_name")?;
            let ngo = require(data, "ngo_name")?;
            Ok((
                format!("New volunteer registration for {ngo}"),
                format!(
                    "{volunteer} has registered to volunteer with {ngo}.\n\n\
                     Sign in to review the registration."
                ),
            ))
        }
        EVENT_REGISTRATION_STATUS => {
            let ngo = require(data, "ngo_name")?;
            let status = require_status(data)?;
            let line = match status {
                ApplicationStatus::Approved => {
                    "has been approved. Welcome aboard!".to_string()
                }
                ApplicationStatus::Rejected => {
                    "was not accepted this time. Thank you for your interest.".to_string()
                }
                ApplicationStatus::Pending => "is back under review.".to_string(),
            };
            Ok((
                format!("Update on your registration with {ngo}"),
                format!("Your volunteer registration with {ngo} {line}"),
            ))
        }
        other => Err(NotifyError::UnknownTemplate(other.to_string())),
    }
}
