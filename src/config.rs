//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `BBQ_`-prefixed environment variables (`__` separates sections,
//! e.g. `BBQ_RABBITMQ__URL`).
//!
//! ```toml
//! [rabbitmq]
//! url = "amqp://127.0.0.1:5672/%2f"
//!
//! [producer]
//! source = "smoker-temps.csv"
//! interval = "30s"
//!
//! [email]
//! host = "smtp.example.com"
//! port = 587
//! address = "pitmaster@example.com"
//! password = "app-password"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// Config file read when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "bbq.toml";

/// Suffix to nanoseconds multiplier (longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
];

/// All settings for the producer and consumers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rabbitmq: RabbitMqSettings,
    pub producer: ProducerSettings,
    /// Mail settings; alerts are only logged when absent.
    pub email: Option<EmailSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RabbitMqSettings {
    /// AMQP connection URI.
    pub url: String,
    /// Management UI address, logged at producer startup.
    pub management_url: String,
}

impl Default for RabbitMqSettings {
    fn default() -> Self {
        Self {
            url: "amqp://127.0.0.1:5672/%2f".to_string(),
            management_url: "http://localhost:15672/#/queues".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerSettings {
    /// Historical CSV log to replay.
    pub source: PathBuf,
    /// Pause between rows.
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            source: PathBuf::from("smoker-temps.csv"),
            interval: Duration::from_secs(30),
        }
    }
}

/// Outgoing mail settings.
///
/// The flat `outgoing_email_*` key names are accepted as aliases.
#[derive(Clone, Deserialize)]
pub struct EmailSettings {
    #[serde(alias = "outgoing_email_host")]
    pub host: String,
    #[serde(alias = "outgoing_email_port", default = "default_smtp_port")]
    pub port: u16,
    #[serde(alias = "outgoing_email_address")]
    pub address: String,
    #[serde(alias = "outgoing_email_password")]
    pub password: String,
}

impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn default_smtp_port() -> u16 {
    587
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `path` must exist; otherwise [`DEFAULT_CONFIG_FILE`] is
    /// read if present.
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, Error> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("BBQ")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Parse duration strings like "30s", "500ms", "2.5m".
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = match val_str.trim().parse() {
                Ok(val) => val,
                Err(_) => bail!("Invalid duration: {}", s),
            };
            if !val.is_finite() || val < 0.0 {
                bail!("Invalid duration: {}", s);
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {}", s)
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2.5m").unwrap(), Duration::from_secs(150));
        assert_eq!(parse_duration("0ns").unwrap(), Duration::ZERO);
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rabbitmq.url, "amqp://127.0.0.1:5672/%2f");
        assert_eq!(settings.producer.interval, Duration::from_secs(30));
        assert_eq!(settings.producer.source, PathBuf::from("smoker-temps.csv"));
        assert!(settings.email.is_none());
    }

    #[test]
    fn test_load_file() {
        let file = write_config(
            r#"
            [rabbitmq]
            url = "amqp://broker:5672/%2f"

            [producer]
            source = "temps.csv"
            interval = "250ms"

            [email]
            host = "smtp.example.com"
            port = 465
            address = "pit@example.com"
            password = "secret"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.rabbitmq.url, "amqp://broker:5672/%2f");
        assert_eq!(settings.producer.source, PathBuf::from("temps.csv"));
        assert_eq!(settings.producer.interval, Duration::from_millis(250));

        let email = settings.email.unwrap();
        assert_eq!(email.host, "smtp.example.com");
        assert_eq!(email.port, 465);
        assert!(!format!("{:?}", email).contains("secret"));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [producer]
            source = "other.csv"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.producer.source, PathBuf::from("other.csv"));
        assert_eq!(settings.producer.interval, Duration::from_secs(30));
        assert_eq!(settings.rabbitmq.url, "amqp://127.0.0.1:5672/%2f");
    }

    #[test]
    fn test_legacy_email_keys() {
        let file = write_config(
            r#"
            [email]
            outgoing_email_host = "smtp.gmail.com"
            outgoing_email_port = 587
            outgoing_email_address = "me@gmail.com"
            outgoing_email_password = "pw"
            "#,
        );

        let email = Settings::load(Some(file.path())).unwrap().email.unwrap();
        assert_eq!(email.host, "smtp.gmail.com");
        assert_eq!(email.port, 587);
        assert_eq!(email.address, "me@gmail.com");
    }

    #[test]
    fn test_bad_interval_is_config_error() {
        let file = write_config(
            r#"
            [producer]
            interval = "forever"
            "#,
        );

        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/bbq.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
