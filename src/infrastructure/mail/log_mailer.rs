use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::{Mail, MailError, Mailer};

/// Development mailer that writes each message to the log instead of sending it
///
/// Links carry live token values and are only emitted at `debug`.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &Mail) -> Result<(), MailError> {
        let link = mail.link().ok_or_else(|| MailError::Render {
            template: mail.template().name().to_string(),
            message: "template data has no link".to_string(),
        })?;

        info!(
            from = %self.from,
            to = ?mail.to(),
            subject = mail.subject(),
            template = mail.template().name(),
            "Mail sent"
        );
        debug!(template = mail.template().name(), link, "Mail link");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use crate::domain::SiteDomain;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    async fn send_with_level(level: tracing::Level, mail: &Mail) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        LogMailer::new("no-reply@localhost").send(mail).await.unwrap();

        captured.contents()
    }

    #[tokio::test]
    async fn test_info_output_omits_token() {
        let site = SiteDomain::new("localhost:3000").unwrap();
        let mail = Mail::password_reset(&site, "a@x.com", "Ann", "live-token-value");

        let output = send_with_level(tracing::Level::INFO, &mail).await;

        assert!(output.contains("Mail sent"));
        assert!(output.contains("password_reset"));
        assert!(!output.contains("live-token-value"));
    }

    #[tokio::test]
    async fn test_debug_output_carries_link() {
        let site = SiteDomain::new("localhost:3000").unwrap();
        let mail = Mail::signup(&site, "a@x.com", "Ann", "live-token-value");

        let output = send_with_level(tracing::Level::DEBUG, &mail).await;

        assert!(output.contains("/auth/signup/live-token-value"));
    }

    #[tokio::test]
    async fn test_send_succeeds() {
        let mailer = LogMailer::new("no-reply@localhost");
        let site = SiteDomain::new("localhost:3000").unwrap();

        let signup = Mail::signup(&site, "a@x.com", "Ann", "tok");
        let reset = Mail::password_reset(&site, "a@x.com", "Ann", "tok");

        assert!(mailer.send(&signup).await.is_ok());
        assert!(mailer.send(&reset).await.is_ok());
    }
}
