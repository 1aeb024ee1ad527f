//! SMTP delivery
//!
//! [`SmtpMailTransport`] sends reminders through the server named in the
//! mail settings. [`compose`] turns a [`MailMessage`] into an RFC 5322
//! message and is shared with the directory transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};
use wire_core::{MailConfig, MailMessage, MailTransport, TransportError};

/// Sender used when no from address is configured
pub const DEFAULT_SENDER: &str = "WIRE <wire@localhost>";

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain connection
    None,
    /// Upgrade with STARTTLS, refusing servers that cannot
    StartTls,
    /// TLS from the first byte (port 465)
    Implicit,
}

impl TlsMode {
    pub fn for_config(config: &MailConfig) -> Self {
        match (config.ssl, config.port) {
            (false, _) => TlsMode::None,
            (true, 465) => TlsMode::Implicit,
            (true, _) => TlsMode::StartTls,
        }
    }
}

/// Parse the configured from address into a mailbox
pub fn sender(from_email: &str) -> Result<Mailbox, TransportError> {
    let from = from_email.trim();
    let from = if from.is_empty() { DEFAULT_SENDER } else { from };
    from.parse()
        .map_err(|e| TransportError::Rejected(format!("invalid from address '{}': {}", from, e)))
}

/// Build the wire message for one outbox entry
pub fn compose(from: &Mailbox, message: &MailMessage) -> Result<Message, TransportError> {
    let address = message
        .to_address
        .parse()
        .map_err(|e| TransportError::Rejected(format!("invalid address '{}': {}", message.to_address, e)))?;
    let name = (!message.to_name.is_empty() && message.to_name != message.to_address)
        .then(|| message.to_name.clone());

    let content_type = if message.is_html {
        ContentType::TEXT_HTML
    } else {
        ContentType::TEXT_PLAIN
    };

    Message::builder()
        .from(from.clone())
        .to(Mailbox::new(name, address))
        .subject(message.subject.clone())
        .header(content_type)
        .body(message.body.clone())
        .map_err(|e| TransportError::Rejected(format!("failed to build message: {}", e)))
}

/// Delivers mail through an SMTP server
pub struct SmtpMailTransport {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Connect settings come from the mail domain; nothing is dialed until the first send
    pub fn from_config(config: &MailConfig) -> Result<Self, TransportError> {
        let host = config.host.trim();
        if host.is_empty() {
            return Err(TransportError::Rejected("mail host is not configured".into()));
        }
        let from = sender(&config.from_email)?;

        let tls = match TlsMode::for_config(config) {
            TlsMode::None => Tls::None,
            TlsMode::StartTls => Tls::Required(tls_parameters(host)?),
            TlsMode::Implicit => Tls::Wrapper(tls_parameters(host)?),
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .timeout(Some(SMTP_TIMEOUT))
            .tls(tls);
        if config.port != 0 {
            builder = builder.port(config.port);
        }
        if !config.user_name.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.user_name.clone(),
                config.password.clone(),
            ));
        }

        debug!(host, port = config.port, ssl = config.ssl, "SMTP transport configured");
        Ok(Self {
            from,
            mailer: builder.build(),
        })
    }

    pub fn sender(&self) -> &Mailbox {
        &self.from
    }
}

fn tls_parameters(host: &str) -> Result<TlsParameters, TransportError> {
    TlsParameters::new(host.to_string())
        .map_err(|e| TransportError::Connection(format!("TLS setup for {}: {}", host, e)))
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        let email = compose(&self.from, message)?;
        self.mailer.send(email).await.map_err(|e| {
            if e.is_permanent() {
                TransportError::Rejected(e.to_string())
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;
        info!(to = %message.to_address, "Message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            host: "smtp.contoso.com".into(),
            port: 2525,
            from_email: "WIRE Bot <wire@contoso.com>".into(),
            user_name: "bot".into(),
            password: "hunter2".into(),
            ..MailConfig::default()
        }
    }

    #[test]
    fn test_compose_headers() {
        let from = sender("wire@contoso.com").unwrap();
        let message = MailMessage::html("Alice Smith", "alice@contoso.com", "Work Item 42 - Disk", "<p>Hi</p>");

        let formatted = String::from_utf8(compose(&from, &message).unwrap().formatted()).unwrap();
        assert!(formatted.contains("From: wire@contoso.com"));
        assert!(formatted.contains("Alice Smith"));
        assert!(formatted.contains("<alice@contoso.com>"));
        assert!(formatted.contains("Subject: Work Item 42 - Disk"));
        assert!(formatted.contains("Content-Type: text/html; charset=utf-8"));
    }

    #[test]
    fn test_compose_plain_uses_bare_address() {
        let from = sender("").unwrap();
        let message = MailMessage::plain("admin@contoso.com", "WIRE report", "no errors found");

        let formatted = String::from_utf8(compose(&from, &message).unwrap().formatted()).unwrap();
        assert!(formatted.contains("To: admin@contoso.com"));
        assert!(formatted.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(formatted.contains("no errors found"));
    }

    #[test]
    fn test_compose_rejects_bad_recipient() {
        let from = sender("wire@contoso.com").unwrap();
        let message = MailMessage::plain("not an address", "s", "b");
        assert!(matches!(compose(&from, &message), Err(TransportError::Rejected(_))));
    }

    #[test]
    fn test_tls_mode_follows_ssl_and_port() {
        let mut config = mail_config();
        assert_eq!(TlsMode::for_config(&config), TlsMode::None);

        config.ssl = true;
        assert_eq!(TlsMode::for_config(&config), TlsMode::StartTls);

        config.port = 465;
        assert_eq!(TlsMode::for_config(&config), TlsMode::Implicit);
    }

    #[test]
    fn test_from_config_uses_from_email() {
        let transport = SmtpMailTransport::from_config(&mail_config()).unwrap();
        assert_eq!(transport.sender().email.to_string(), "wire@contoso.com");
        assert_eq!(transport.sender().name.as_deref(), Some("WIRE Bot"));
    }

    #[test]
    fn test_from_config_rejects_bad_settings() {
        let mut config = mail_config();
        config.from_email = "nobody".into();
        assert!(matches!(
            SmtpMailTransport::from_config(&config),
            Err(TransportError::Rejected(_))
        ));

        let config = MailConfig::default();
        assert!(matches!(
            SmtpMailTransport::from_config(&config),
            Err(TransportError::Rejected(_))
        ));
    }
}
