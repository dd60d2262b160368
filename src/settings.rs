use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::path::PathBuf;

use crate::sentiment_filter::SentimentFilter;
use crate::sentiment_filter::sentiment_settings::load_sentiment_settings;

pub const DEFAULT_IMAP_SERVER: &str = "imap.gmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SENTIMENT_SETTINGS: &str = "src/resources/sentiment_settings.yaml";

// Main configuration struct, built once at start-up
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub notification_email: String,
    pub imap: ImapConfig,
    pub smtp: SmtpConfig,
    pub max_emails: usize,
    pub filter: SentimentFilter,
}

/// Account login, shared by the IMAP session and the SMTP relay.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub server: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("missing required environment variable: {}", key))
}

fn port(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u16) -> Result<u16> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {} {:?}: {}", key, value, e)),
    }
}

impl Config {
    /// Build the configuration from a variable lookup (normally the process
    /// environment, see [`load_settings`]).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let email = required(&lookup, "EMAIL")?;
        let password = required(&lookup, "EMAIL_PASSWORD")?;
        let notification_email = required(&lookup, "NOTIFICATION_EMAIL")?;

        let imap = ImapConfig {
            server: lookup("IMAP_SERVER").unwrap_or_else(|| DEFAULT_IMAP_SERVER.to_string()),
            port: port(&lookup, "IMAP_PORT", DEFAULT_IMAP_PORT)?,
        };
        let smtp = SmtpConfig {
            server: lookup("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            port: port(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
        };

        let settings_path = PathBuf::from(
            lookup("SENTIMENT_SETTINGS").unwrap_or_else(|| DEFAULT_SENTIMENT_SETTINGS.to_string()),
        );
        let sentiment = load_sentiment_settings(&settings_path)?;
        if sentiment.max_emails == 0 {
            bail!("max_emails in {} must be at least 1", settings_path.display());
        }

        Ok(Config {
            credentials: Credentials {
                username: email,
                password,
            },
            notification_email,
            imap,
            smtp,
            max_emails: sentiment.max_emails,
            filter: SentimentFilter::new(&sentiment),
        })
    }
}

/// Configuration from the process environment; `.env` is loaded by `main`.
pub fn load_settings() -> Result<Config> {
    Config::from_lookup(|key| std::env::var(key).ok())
}
