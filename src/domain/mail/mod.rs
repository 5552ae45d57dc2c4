//! Mail domain - outgoing message descriptors and the mailer contract

mod mailer;
mod message;
mod site;

pub use mailer::Mailer;
pub use message::{Mail, MailTemplate};
pub use site::{InvalidSiteDomain, SiteDomain};

#[cfg(test)]
pub use mailer::MockMailer;
