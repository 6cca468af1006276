//! Configuration types.
//!
//! Nothing here reads process state on its own: loaders take a key lookup so
//! the driver decides where values come from (environment, `.env`, tests).

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default SMTP submission host.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP port (implicit TLS).
pub const DEFAULT_SMTP_PORT: u16 = 465;

const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONVERT_TIMEOUT_SECS: u64 = 120;

/// Outbound mail account, built from environment variables.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Account identity, also used as the `From` address.
    pub sender_address: String,
    /// Account secret (app password).
    pub sender_credential: SecretString,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Bound on connecting to and talking with the SMTP server.
    pub timeout: Duration,
}

impl MailConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// Fails fast when `EMAIL_ADDRESS` or `EMAIL_PASSWORD` is absent or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sender_address = required(&lookup, "EMAIL_ADDRESS")?;
        let sender_credential = SecretString::from(required(&lookup, "EMAIL_PASSWORD")?);

        let smtp_host = lookup("SMTP_SERVER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());

        let smtp_port = parsed(&lookup, "SMTP_PORT")?.unwrap_or(DEFAULT_SMTP_PORT);
        let timeout_secs =
            parsed(&lookup, "SMTP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS);

        Ok(Self {
            sender_address,
            sender_credential,
            smtp_host,
            smtp_port,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Rendering and output layout settings.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// LibreOffice executable used for DOCX to PDF conversion.
    pub soffice_bin: PathBuf,
    pub convert_timeout: Duration,
    /// Root under which each run gets its own directory.
    pub output_root: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            soffice_bin: PathBuf::from("soffice"),
            convert_timeout: Duration::from_secs(DEFAULT_CONVERT_TIMEOUT_SECS),
            output_root: PathBuf::from("sertifikat"),
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let soffice_bin = lookup("CERTGEN_SOFFICE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.soffice_bin);
        let convert_timeout = parsed(&lookup, "CERTGEN_CONVERT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.convert_timeout);
        let output_root = lookup("CERTGEN_OUTPUT_ROOT")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_root);

        Ok(Self {
            soffice_bin,
            convert_timeout,
            output_root,
        })
    }

    /// Per-run output directory: `<output_root>/sertifikat_<table stem>`.
    pub fn run_dir(&self, table_path: &Path) -> PathBuf {
        let stem = table_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "peserta".to_string());
        self.output_root.join(format!("sertifikat_{stem}"))
    }
}

/// Subject and body of the notification sent with each certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub subject: String,
    pub body: String,
}

/// Everything the driver collected before a run starts.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub table_path: PathBuf,
    pub template_path: PathBuf,
    pub name_column: String,
    /// `None` disables email validation and notification.
    pub email_column: Option<String>,
    /// Present only when `email_column` is set and sending was requested.
    pub announcement: Option<Announcement>,
}

impl RunRequest {
    /// Whether this run sends certificates after generating them.
    pub fn wants_delivery(&self) -> bool {
        self.email_column.is_some() && self.announcement.is_some()
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).map(|s| s.trim().to_string()) {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{s:?}: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn mail_config_defaults() {
        let config = MailConfig::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", "panitia@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
        ]))
        .unwrap();
        assert_eq!(config.sender_address, "panitia@example.com");
        assert_eq!(config.sender_credential.expose_secret(), "app-password");
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 465);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn mail_config_overrides() {
        let config = MailConfig::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", "panitia@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
            ("SMTP_SERVER", "mail.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.smtp_host, "mail.example.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn mail_config_requires_identity() {
        let err = MailConfig::from_lookup(lookup(&[("EMAIL_PASSWORD", "x")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "EMAIL_ADDRESS"));
    }

    #[test]
    fn mail_config_rejects_blank_credential() {
        let err = MailConfig::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", "panitia@example.com"),
            ("EMAIL_PASSWORD", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "EMAIL_PASSWORD"));
    }

    #[test]
    fn mail_config_rejects_bad_port() {
        let err = MailConfig::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", "panitia@example.com"),
            ("EMAIL_PASSWORD", "x"),
            ("SMTP_PORT", "smtp"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SMTP_PORT"));
    }

    #[test]
    fn render_config_defaults_and_run_dir() {
        let config = RenderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.soffice_bin, PathBuf::from("soffice"));
        assert_eq!(config.convert_timeout, Duration::from_secs(120));
        assert_eq!(
            config.run_dir(Path::new("data/absen.xlsx")),
            PathBuf::from("sertifikat/sertifikat_absen")
        );
    }

    #[test]
    fn render_config_overrides() {
        let config = RenderConfig::from_lookup(lookup(&[
            ("CERTGEN_SOFFICE", "/opt/libreoffice/program/soffice"),
            ("CERTGEN_CONVERT_TIMEOUT_SECS", "10"),
            ("CERTGEN_OUTPUT_ROOT", "/tmp/out"),
        ]))
        .unwrap();
        assert_eq!(
            config.soffice_bin,
            PathBuf::from("/opt/libreoffice/program/soffice")
        );
        assert_eq!(config.convert_timeout, Duration::from_secs(10));
        assert_eq!(
            config.run_dir(Path::new("pendaftaran.csv")),
            PathBuf::from("/tmp/out/sertifikat_pendaftaran")
        );
    }

    #[test]
    fn run_request_delivery_needs_column_and_announcement() {
        let mut request = RunRequest {
            table_path: "absen.xlsx".into(),
            template_path: "template.docx".into(),
            name_column: "Nama".into(),
            email_column: None,
            announcement: Some(Announcement {
                subject: "Sertifikat".into(),
                body: "Terima kasih".into(),
            }),
        };
        assert!(!request.wants_delivery());
        request.email_column = Some("Email".into());
        assert!(request.wants_delivery());
    }
}
