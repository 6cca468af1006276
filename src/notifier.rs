//! Certificate delivery by email: SMTP via lettre.
//!
//! One message per certificate: plain-text body plus the PDF as an
//! attachment. No retries; the caller decides what to do with a failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::config::MailConfig;
use crate::error::{ConfigError, DeliveryError};

/// One certificate addressed to one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingCertificate {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

/// Delivers certificates to their recipients.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OutgoingCertificate) -> Result<(), DeliveryError>;
}

/// SMTP notifier. Port 465 uses implicit TLS, anything else STARTTLS.
pub struct SmtpNotifier {
    config: MailConfig,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Result<Self, ConfigError> {
        let from: Mailbox = config
            .sender_address
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "EMAIL_ADDRESS".into(),
                message: format!("{}: {e}", config.sender_address),
            })?;
        Ok(Self { config, from })
    }

    fn transport(&self, recipient: &str) -> Result<SmtpTransport, DeliveryError> {
        let builder = if self.config.smtp_port == 465 {
            SmtpTransport::relay(&self.config.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
        }
        .map_err(|e| DeliveryError::Transport {
            recipient: recipient.to_string(),
            reason: format!("SMTP relay error: {e}"),
        })?;

        let creds = Credentials::new(
            self.config.sender_address.clone(),
            self.config.sender_credential.expose_secret().to_string(),
        );

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(creds)
            .timeout(Some(self.config.timeout))
            .build())
    }

    /// Open and authenticate a connection without sending anything.
    pub async fn check_connection(&self) -> Result<(), DeliveryError> {
        let host = self.config.smtp_host.clone();
        let transport = self.transport(&host)?;
        let ok = tokio::task::spawn_blocking(move || transport.test_connection())
            .await
            .map_err(|e| DeliveryError::Transport {
                recipient: host.clone(),
                reason: format!("connection check panicked: {e}"),
            })?
            .map_err(|e| DeliveryError::Transport {
                recipient: host.clone(),
                reason: e.to_string(),
            })?;

        if ok {
            tracing::info!(host = %host, port = self.config.smtp_port, "SMTP connection ok");
            Ok(())
        } else {
            Err(DeliveryError::Transport {
                recipient: host,
                reason: "server did not accept the connection".into(),
            })
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &OutgoingCertificate) -> Result<(), DeliveryError> {
        let attachment = read_attachment(&message.attachment).await?;
        let email = build_message(&self.from, message, attachment)?;
        let transport = self.transport(&message.recipient)?;

        let recipient = message.recipient.clone();
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| DeliveryError::Transport {
                recipient: recipient.clone(),
                reason: format!("send task panicked: {e}"),
            })?
            .map_err(|e| {
                if e.is_permanent() {
                    DeliveryError::Rejected {
                        recipient: recipient.clone(),
                        reason: e.to_string(),
                    }
                } else {
                    DeliveryError::Transport {
                        recipient: recipient.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        tracing::info!("Email sent to {recipient}");
        Ok(())
    }
}

async fn read_attachment(path: &Path) -> Result<Vec<u8>, DeliveryError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DeliveryError::MissingAttachment(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the MIME message for one certificate.
pub fn build_message(
    from: &Mailbox,
    message: &OutgoingCertificate,
    attachment: Vec<u8>,
) -> Result<Message, DeliveryError> {
    let to: Mailbox = message
        .recipient
        .parse()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: message.recipient.clone(),
            reason: format!("{e}"),
        })?;

    let filename = message
        .attachment
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sertifikat.pdf".to_string());

    let pdf = ContentType::parse("application/pdf").map_err(|e| DeliveryError::Message {
        recipient: message.recipient.clone(),
        reason: format!("content type: {e}"),
    })?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(message.subject.as_str())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(message.body.clone()))
                .singlepart(Attachment::new(filename).body(attachment, pdf)),
        )
        .map_err(|e| DeliveryError::Message {
            recipient: message.recipient.clone(),
            reason: format!("Failed to build email: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            sender_address: "panitia@example.com".into(),
            sender_credential: SecretString::from("app-password"),
            smtp_host: "smtp.example.com".into(),
            smtp_port: 465,
            timeout: Duration::from_secs(1),
        }
    }

    fn outgoing(attachment: PathBuf) -> OutgoingCertificate {
        OutgoingCertificate {
            recipient: "maria@test.com".into(),
            subject: "Sertifikat Seminar".into(),
            body: "Terima kasih telah hadir.".into(),
            attachment,
        }
    }

    #[test]
    fn rejects_invalid_sender() {
        let mut cfg = config();
        cfg.sender_address = "not an address".into();
        assert!(matches!(
            SmtpNotifier::new(cfg),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "EMAIL_ADDRESS"
        ));
    }

    #[test]
    fn message_has_body_and_pdf_attachment() {
        let from: Mailbox = "panitia@example.com".parse().unwrap();
        let msg = build_message(
            &from,
            &outgoing(PathBuf::from("out/Maria Garcia.pdf")),
            b"%PDF-1.4".to_vec(),
        )
        .unwrap();
        let raw = String::from_utf8_lossy(&msg.formatted()).into_owned();
        assert!(raw.contains("Subject: Sertifikat Seminar"));
        assert!(raw.contains("To: maria@test.com"));
        assert!(raw.contains("Terima kasih telah hadir."));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("Maria Garcia.pdf"));
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let from: Mailbox = "panitia@example.com".parse().unwrap();
        let mut out = outgoing(PathBuf::from("x.pdf"));
        out.recipient = "not-an-email".into();
        assert!(matches!(
            build_message(&from, &out, vec![]),
            Err(DeliveryError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn missing_attachment_fails_before_connecting() {
        let notifier = SmtpNotifier::new(config()).unwrap();
        let err = notifier
            .send(&outgoing(PathBuf::from("/nonexistent/Maria Garcia.pdf")))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::MissingAttachment(_)));
    }
}
