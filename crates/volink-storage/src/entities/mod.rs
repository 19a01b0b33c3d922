pub mod campaign;
pub mod campaign_application;
pub mod notification;
pub mod otp_code;
pub mod profile;
pub mod volunteer_registration;
