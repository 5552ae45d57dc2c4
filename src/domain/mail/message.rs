//! Rendered-message descriptors handed to a mail collaborator

use serde::Serialize;
use serde_json::{json, Value};

use super::site::SiteDomain;

const SIGNUP_PATH: &str = "signup";
const RESET_PASSWORD_PATH: &str = "reset-password";

/// Template a mail is rendered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTemplate {
    Signup,
    PasswordReset,
}

impl MailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::PasswordReset => "password_reset",
        }
    }
}

/// Subject, recipients, template and template data of one outgoing mail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mail {
    subject: String,
    to: Vec<String>,
    template: MailTemplate,
    data: Value,
}

impl Mail {
    /// Confirmation mail carrying the signup link
    pub fn signup(site: &SiteDomain, email: &str, name: &str, token: &str) -> Self {
        Self::with_link(
            "Confirm your email address",
            MailTemplate::Signup,
            site.url(&["auth", SIGNUP_PATH, token]),
            email,
            name,
        )
    }

    /// Mail carrying the password reset link
    pub fn password_reset(site: &SiteDomain, email: &str, name: &str, token: &str) -> Self {
        Self::with_link(
            "Change your password",
            MailTemplate::PasswordReset,
            site.url(&["auth", RESET_PASSWORD_PATH, token]),
            email,
            name,
        )
    }

    fn with_link(
        subject: &str,
        template: MailTemplate,
        url: String,
        email: &str,
        name: &str,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            to: vec![email.to_string()],
            template,
            data: json!({ "name": name, "url": url }),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    pub fn template(&self) -> MailTemplate {
        self.template
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Link embedded in the template data, if any
    pub fn link(&self) -> Option<&str> {
        self.data.get("url").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_mail() {
        let site = SiteDomain::new("example.com").unwrap();
        let mail = Mail::signup(&site, "a@x.com", "Ann", "tok_123");

        assert_eq!(mail.subject(), "Confirm your email address");
        assert_eq!(mail.to(), ["a@x.com".to_string()]);
        assert_eq!(mail.template(), MailTemplate::Signup);
        assert_eq!(mail.template().name(), "signup");
        assert_eq!(mail.link(), Some("https://example.com/auth/signup/tok_123"));
        assert_eq!(mail.data()["name"], "Ann");
    }

    #[test]
    fn test_password_reset_mail() {
        let site = SiteDomain::new("localhost:3000").unwrap();
        let mail = Mail::password_reset(&site, "a@x.com", "Ann", "tok_456");

        assert_eq!(mail.subject(), "Change your password");
        assert_eq!(mail.template().name(), "password_reset");
        assert_eq!(
            mail.link(),
            Some("http://localhost:3000/auth/reset-password/tok_456")
        );
    }
}
