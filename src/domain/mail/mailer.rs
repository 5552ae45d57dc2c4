//! Mail collaborator contract

use async_trait::async_trait;

use super::message::Mail;
use crate::domain::error::MailError;

#[cfg(test)]
use mockall::automock;

/// Sends a rendered mail and reports the outcome synchronously
///
/// A failure is fatal to the enclosing unit of work: the identity service
/// rolls back the user or token change the mail was tied to.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &Mail) -> Result<(), MailError>;
}
