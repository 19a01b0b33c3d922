mod log;
mod memory;
mod smtp;

pub use log::LogMailer;
pub use memory::{MemoryMailer, OutboundMail};
pub use smtp::SmtpMailer;
