//! Relational storage layer for the matchmaking service.
//!
//! All persistent state (profiles, campaigns, applications, registrations,
//! notifications, OTP codes) lives in a single SQLite database accessed
//! through [`store::HubStore`], a SeaORM-backed async access layer. Schema
//! management is handled by the `migration` crate at connect time.

pub mod auth;
pub mod entities;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::{
    ApplicationFilter, ApplicationRow, CampaignFilter, CampaignRow, CampaignUpdate, HubStore,
    NewApplication, NewCampaign, NewNotification, NewProfile, NewRegistration, NotificationRow,
    OtpCodeRow, ProfileFilter, ProfileRow, ProfileUpdate, RegistrationFilter, RegistrationRow,
};
