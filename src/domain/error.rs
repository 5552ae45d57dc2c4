use thiserror::Error;

use super::user::UserValidationError;

/// Errors raised at the password hashing boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("invalid password")]
    InvalidPassword,

    #[error("invalid hash")]
    InvalidHash,

    #[error("invalid salt")]
    InvalidSalt,

    #[error("password does not match")]
    PasswordNotMatch,

    #[error("invalid argon2 parameters: {message}")]
    Params { message: String },
}

impl HashError {
    pub fn params(message: impl Into<String>) -> Self {
        Self::Params {
            message: message.into(),
        }
    }
}

/// Errors raised by the transactional store
///
/// `Begin`, `Commit` and `Rollback` are transaction bookkeeping failures; every
/// other variant comes from a statement executed inside the unit of work.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to begin the transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("failed to commit the transaction: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("failed to roll back the transaction after \"{cause}\": {source}")]
    Rollback {
        cause: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("{context}: unique constraint violated")]
    Conflict { context: &'static str },

    #[error("corrupt row: {message}")]
    Corrupt { message: String },

    #[error("migration {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub fn query(context: &'static str, source: sqlx::Error) -> Self {
        Self::Query { context, source }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// True when the failure came from transaction management rather than a statement
    pub fn is_bookkeeping(&self) -> bool {
        matches!(
            self,
            Self::Begin(_) | Self::Commit(_) | Self::Rollback { .. }
        )
    }
}

/// Errors reported by a mail collaborator
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("failed to render template {template}: {message}")]
    Render { template: String, message: String },

    #[error("failed to deliver mail: {message}")]
    Delivery { message: String },
}

/// Errors returned by the identity service
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already in use")]
    EmailInUse,

    #[error("verify your mail box")]
    UserNotVerified,

    #[error("email not found")]
    EmailNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("user already verified")]
    UserAlreadyVerified,

    #[error("invalid token")]
    InvalidToken,

    #[error(transparent)]
    Validation(#[from] UserValidationError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] HashError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to send mail: {0}")]
    Mail(#[from] MailError),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl IdentityError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::EmailInUse => ErrorKind::EmailInUse,
            Self::UserNotVerified => ErrorKind::UserNotVerified,
            Self::EmailNotFound => ErrorKind::EmailNotFound,
            Self::UserNotFound => ErrorKind::UserNotFound,
            Self::UserAlreadyVerified => ErrorKind::UserAlreadyVerified,
            Self::InvalidToken => ErrorKind::InvalidToken,
            Self::Validation(_) | Self::Hash(HashError::InvalidPassword) => ErrorKind::Validation,
            Self::Hash(_) | Self::Store(_) | Self::Mail(_) | Self::Internal { .. } => {
                ErrorKind::Infrastructure
            }
        }
    }
}

/// Closed classification of identity failures for the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidCredentials,
    EmailInUse,
    UserNotVerified,
    EmailNotFound,
    UserNotFound,
    UserAlreadyVerified,
    InvalidToken,
    Validation,
    Infrastructure,
}

/// Text shown to the end user when a recovery request may not reveal whether an account exists
pub const NEUTRAL_RECOVERY_MESSAGE: &str =
    "If an account exists for that address, an email is on its way.";

impl ErrorKind {
    /// User-facing message for this kind
    ///
    /// Signin coalesces unknown emails into `InvalidCredentials` at the service;
    /// recovery flows report `EmailNotFound` precisely and this table hides it
    /// behind the same text a successful request shows.
    pub fn public_message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid email or password.",
            Self::EmailInUse => "This email address is already registered.",
            Self::UserNotVerified => "Please confirm your email address first.",
            Self::EmailNotFound => NEUTRAL_RECOVERY_MESSAGE,
            Self::UserNotFound => "Your session is no longer valid. Please sign in again.",
            Self::UserAlreadyVerified => "This account is already confirmed. You can sign in.",
            Self::InvalidToken => "This link is invalid or has expired.",
            Self::Validation => "Please check the submitted data and try again.",
            Self::Infrastructure => "Something went wrong. Please try again later.",
        }
    }

    /// User-facing message for the resend and password reset requests
    ///
    /// Both answer an unknown or unconfirmed address with the text a
    /// successful request shows.
    pub fn recovery_message(self) -> &'static str {
        match self {
            Self::EmailNotFound | Self::UserNotVerified => NEUTRAL_RECOVERY_MESSAGE,
            other => other.public_message(),
        }
    }

    /// Whether the failure was caused by the request rather than the system
    pub fn is_client_error(self) -> bool {
        !matches!(self, Self::Infrastructure)
    }
}
