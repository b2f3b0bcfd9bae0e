use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub use config::ConfigError;

use crate::mail::{MailerConfig, TlsMode};
use crate::notifier::{DeliveryPolicy, Envelope};

/// Process configuration, read once at startup.
///
/// Every field maps to an upper-case environment variable of the same name
/// (`email_user` ← `EMAIL_USER`).
#[derive(Clone, Deserialize)]
pub struct Config {
    /// SMTP username, also used as the sender address.
    pub email_user: String,
    pub email_pass: String,
    /// The single mailbox every submission is relayed to.
    pub receiver_email: String,

    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_tls: TlsMode,
    /// Seconds; unset means the send may block indefinitely.
    #[serde(default)]
    pub smtp_timeout: Option<u64>,

    #[serde(default)]
    pub cleanup_on_failure: bool,
    #[serde(default)]
    pub test_email_enabled: bool,
}

fn default_port() -> u16 {
    5000
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(config::Environment::default())
    }

    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        Self::load(config::Environment::with_prefix(prefix))
    }

    fn load(source: config::Environment) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn mailer_config(&self) -> MailerConfig {
        MailerConfig {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: Some(self.email_user.clone()),
            password: Some(self.email_pass.clone()),
            tls: self.smtp_tls,
            timeout: self.smtp_timeout.map(Duration::from_secs),
        }
    }

    pub fn envelope(&self) -> Envelope {
        Envelope {
            from: self.email_user.clone(),
            to: self.receiver_email.clone(),
        }
    }

    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            cleanup_on_failure: self.cleanup_on_failure,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("email_user", &self.email_user)
            .field("email_pass", &"<redacted>")
            .field("receiver_email", &self.receiver_email)
            .field("port", &self.port)
            .field("bind_address", &self.bind_address)
            .field("upload_dir", &self.upload_dir)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_tls", &self.smtp_tls)
            .field("smtp_timeout", &self.smtp_timeout)
            .field("cleanup_on_failure", &self.cleanup_on_failure)
            .field("test_email_enabled", &self.test_email_enabled)
            .finish()
    }
}
