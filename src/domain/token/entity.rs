//! Single-use, typed, expiring tokens

use std::str::FromStr;

/// Purpose a token was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Confirms ownership of the email used at signup
    Signup,
    /// Authorizes setting a new password without the old one
    PasswordReset,
}

impl TokenType {
    /// Value stored in the `type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "SIGNUP",
            Self::PasswordReset => "RESET_PASSWORD",
        }
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIGNUP" => Ok(Self::Signup),
            "RESET_PASSWORD" => Ok(Self::PasswordReset),
            other => Err(format!("unknown token type '{}'", other)),
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token row
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    token_type: TokenType,
    email: String,
    /// Absolute expiry, milliseconds since the Unix epoch
    expires_at: i64,
}

impl Token {
    pub fn new(
        value: impl Into<String>,
        token_type: TokenType,
        email: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            value: value.into(),
            token_type,
            email: email.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// A token is live strictly before its expiry instant
    pub fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }

    pub fn into_email(self) -> String {
        self.email
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
