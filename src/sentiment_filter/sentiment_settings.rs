use serde::Deserialize;

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use anyhow::{Context, Result};
use backtrace::Backtrace;
use log::{error, info};

pub const DEFAULT_MAX_EMAILS: usize = 10;

pub const DEFAULT_NEGATIVE_KEYWORDS: [&str; 4] = ["leider", "abgelehnt", "nicht möglich", "bedauern"];
pub const DEFAULT_POSITIVE_KEYWORDS: [&str; 4] = ["herzlichen glückwunsch", "zusage", "erfolgreich", "willkommen"];

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SentimentSettings {
    pub max_emails: usize,
    pub negative_keywords: Vec<String>,
    pub positive_keywords: Vec<String>,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            max_emails: DEFAULT_MAX_EMAILS,
            negative_keywords: DEFAULT_NEGATIVE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            positive_keywords: DEFAULT_POSITIVE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Load keyword lists from a YAML file. A missing file yields the built-in
/// German defaults; an unreadable or malformed one is an error.
pub fn load_sentiment_settings(path: &Path) -> Result<SentimentSettings> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("No keyword settings at {}, using defaults", path.display());
            return Ok(SentimentSettings::default());
        }
        Err(err) => {
            error!("Error: {}", err);

            // Capture and print the backtrace
            let backtrace = Backtrace::new();
            error!("Backtrace:\n{:?}", backtrace);
            return Err(err).with_context(|| format!("cannot open {}", path.display()));
        }
    };

    let reader = BufReader::new(file);

    // Parse the YAML file into the SentimentSettings struct
    match serde_yaml::from_reader(reader) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            error!("Error: {}", err);

            let backtrace = Backtrace::new();
            error!("Backtrace:\n{:?}", backtrace);
            Err(err).with_context(|| format!("cannot deserialize {}", path.display()))
        }
    }
}
