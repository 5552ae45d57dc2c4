//! Domain layer: identity entities, tokens, mail descriptors and error types

pub mod error;
pub mod mail;
pub mod token;
pub mod user;

pub use error::{ErrorKind, HashError, IdentityError, MailError, StoreError};
pub use mail::{Mail, MailTemplate, Mailer, SiteDomain};
pub use token::{Token, TokenType};
pub use user::{HashedPassword, PublicUser, User, UserId};
