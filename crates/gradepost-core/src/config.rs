//! Run configuration.
//!
//! Loaded once from a JSON file at startup and never changed afterwards.
//! Only the sender credentials and the two input paths are required; every
//! other field falls back to the defaults below.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default outgoing mail server.
pub const DEFAULT_SMTP_HOST: &str = "postout.lrz.de";
/// Default submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;
/// Default subject line.
pub const DEFAULT_SUBJECT: &str = "Individual submission correction";
/// Default per-send timeout in seconds.
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 60;

/// Complete run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Sender address and password.
    pub sender_data: SenderData,
    /// Roster CSV file.
    pub records_path: PathBuf,
    /// Directory holding one folder per submission.
    pub submissions_path: PathBuf,
    /// Outgoing server settings.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Subject of every mail.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Roster field delimiter.
    #[serde(default = "default_delimiter")]
    pub records_delimiter: char,
    /// Upper bound for connecting and for each single send.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// What to do with folders that match no student.
    #[serde(default)]
    pub on_unresolved: UnresolvedPolicy,
    /// What to do when one submission fails to send.
    #[serde(default)]
    pub on_send_error: SendErrorPolicy,
    /// Regex whose first group captures the name in a folder name.
    #[serde(default)]
    pub folder_pattern: Option<String>,
}

/// Sender credentials.
#[derive(Clone, Deserialize)]
pub struct SenderData {
    /// Sender address, also used as login name.
    pub mail: String,
    /// Login password.
    pub password: String,
}

impl fmt::Debug for SenderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderData")
            .field("mail", &self.mail)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outgoing server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connection security.
    pub security: Security,
    /// Name announced in EHLO.
    pub helo_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            security: Security::default(),
            helo_name: "localhost".to_string(),
        }
    }
}

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain connection upgraded with STARTTLS.
    #[default]
    StartTls,
    /// Implicit TLS from the first byte.
    Tls,
    /// No encryption.
    None,
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTls => write!(f, "starttls"),
            Self::Tls => write!(f, "tls"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Handling of submission folders whose name matches no student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Fail the whole index build.
    #[default]
    Abort,
    /// Log the folder, leave it in place, carry on.
    Skip,
}

/// Handling of a submission that fails to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendErrorPolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Leave the submission pending and go on with the next one.
    Continue,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

const fn default_delimiter() -> char {
    ','
}

const fn default_send_timeout() -> u64 {
    DEFAULT_SEND_TIMEOUT_SECS
}

/// Problem found while validating a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Sender address is empty.
    EmptySender,
    /// Sender address is not of the form `local@domain`.
    InvalidSender,
    /// Password is empty.
    EmptyPassword,
    /// SMTP host is empty.
    EmptyHost,
    /// SMTP port is zero.
    InvalidPort,
    /// Send timeout is zero.
    ZeroTimeout,
    /// Roster delimiter is not a single ASCII character.
    InvalidDelimiter,
}

impl ValidationError {
    /// Human-readable description.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptySender => "sender_data.mail is required",
            Self::InvalidSender => "sender_data.mail is not a valid email address",
            Self::EmptyPassword => "sender_data.password is required",
            Self::EmptyHost => "smtp.host is required",
            Self::InvalidPort => "smtp.port must be 1-65535",
            Self::ZeroTimeout => "send_timeout_secs must be greater than 0",
            Self::InvalidDelimiter => "records_delimiter must be a single ASCII character",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Config {
    /// Reads, parses and validates a configuration file.
    ///
    /// Relative `records_path` and `submissions_path` are taken relative to
    /// the directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, is not valid
    /// JSON of the expected shape, or fails [`Config::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.records_path = base.join(&config.records_path);
        config.submissions_path = base.join(&config.submissions_path);

        config.validate()?;
        tracing::debug!(
            sender = %config.sender_data.mail,
            host = %config.smtp.host,
            port = config.smtp.port,
            security = %config.smtp.security,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses a configuration from JSON text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed JSON or missing fields.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Collects every validation problem.
    ///
    /// # Errors
    ///
    /// Returns all problems found, in field order.
    pub fn problems(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mail = self.sender_data.mail.trim();
        if mail.is_empty() {
            errors.push(ValidationError::EmptySender);
        } else if !is_valid_email(mail) {
            errors.push(ValidationError::InvalidSender);
        }
        if self.sender_data.password.is_empty() {
            errors.push(ValidationError::EmptyPassword);
        }

        if self.smtp.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost);
        }
        if self.smtp.port == 0 {
            errors.push(ValidationError::InvalidPort);
        }
        if self.send_timeout_secs == 0 {
            errors.push(ValidationError::ZeroTimeout);
        }
        if !self.records_delimiter.is_ascii() {
            errors.push(ValidationError::InvalidDelimiter);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing every problem.
    pub fn validate(&self) -> Result<()> {
        self.problems().map_err(|errors| {
            let list: Vec<&str> = errors.iter().map(ValidationError::message).collect();
            Error::Config(list.join("; "))
        })
    }

    /// Per-send timeout.
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Roster delimiter as a byte.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.records_delimiter).unwrap_or(b',')
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "sender_data": { "mail": "tutor@tum.de", "password": "secret" },
        "records_path": "records.csv",
        "submissions_path": "submissions"
    }"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_json(MINIMAL).unwrap();
        assert_eq!(config.smtp, SmtpConfig::default());
        assert_eq!(config.smtp.host, "postout.lrz.de");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.security, Security::StartTls);
        assert_eq!(config.subject, "Individual submission correction");
        assert_eq!(config.records_delimiter, ',');
        assert_eq!(config.send_timeout(), Duration::from_secs(60));
        assert_eq!(config.on_unresolved, UnresolvedPolicy::Abort);
        assert_eq!(config.on_send_error, SendErrorPolicy::Abort);
        assert_eq!(config.folder_pattern, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn full_config_parses() {
        let config = Config::from_json(
            r#"{
                "sender_data": { "mail": "tutor@tum.de", "password": "secret" },
                "records_path": "r.csv",
                "submissions_path": "s",
                "smtp": { "host": "127.0.0.1", "port": 2525, "security": "none" },
                "records_delimiter": ";",
                "send_timeout_secs": 5,
                "on_unresolved": "skip",
                "on_send_error": "continue"
            }"#,
        )
        .unwrap();
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.security, Security::None);
        assert_eq!(config.smtp.helo_name, "localhost");
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.on_unresolved, UnresolvedPolicy::Skip);
        assert_eq!(config.on_send_error, SendErrorPolicy::Continue);
    }

    #[test]
    fn missing_required_field_is_config_error() {
        let err = Config::from_json(r#"{ "records_path": "r.csv" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut config = Config::from_json(MINIMAL).unwrap();
        config.sender_data.mail = "not-an-address".into();
        config.sender_data.password = String::new();
        config.smtp.port = 0;
        config.send_timeout_secs = 0;

        assert_eq!(
            config.problems().unwrap_err(),
            vec![
                ValidationError::InvalidSender,
                ValidationError::EmptyPassword,
                ValidationError::InvalidPort,
                ValidationError::ZeroTimeout,
            ]
        );
        let Error::Config(message) = config.validate().unwrap_err() else {
            panic!("expected a config error");
        };
        assert!(message.contains("smtp.port"));
        assert!(message.contains("send_timeout_secs"));
    }

    #[test]
    fn load_resolves_paths_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(MINIMAL.as_bytes())
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.records_path, dir.path().join("records.csv"));
        assert_eq!(config.submissions_path, dir.path().join("submissions"));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn debug_hides_password() {
        let config = Config::from_json(MINIMAL).unwrap();
        let shown = format!("{config:?}");
        assert!(shown.contains("tutor@tum.de"));
        assert!(!shown.contains("secret"));
    }
}
