//! Mail infrastructure - mailer implementations

mod log_mailer;

pub use log_mailer::LogMailer;
