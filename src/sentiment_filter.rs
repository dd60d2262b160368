pub mod sentiment_settings;

use serde::Serialize;
use log::debug;

use crate::sentiment_filter::sentiment_settings::SentimentSettings;

/// Characters of the original body quoted in a notification.
pub const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    Negative,
    Positive,
}

impl Sentiment {
    pub fn notification_subject(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative Email Detected",
            Sentiment::Positive => "Positive Email Detected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Positive => "Positive",
        }
    }
}

/// Lower-case substrings for one sentiment category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.trim().is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// `folded` must already be lower-case.
    pub fn matches(&self, folded: &str) -> bool {
        self.keywords.iter().any(|keyword| {
            let hit = folded.contains(keyword.as_str());
            if hit {
                debug!("keyword {:?} matched", keyword);
            }
            hit
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentFilter {
    pub negative: KeywordSet,
    pub positive: KeywordSet,
}

impl SentimentFilter {
    pub fn new(settings: &SentimentSettings) -> Self {
        Self {
            negative: KeywordSet::new(&settings.negative_keywords),
            positive: KeywordSet::new(&settings.positive_keywords),
        }
    }

    /// Every category whose keywords occur in `body`, negative first.
    pub fn classify(&self, body: &str) -> Vec<Sentiment> {
        let folded = body.to_lowercase();
        let mut found = Vec::new();
        if self.negative.matches(&folded) {
            found.push(Sentiment::Negative);
        }
        if self.positive.matches(&folded) {
            found.push(Sentiment::Positive);
        }
        found
    }
}

impl Default for SentimentFilter {
    fn default() -> Self {
        Self::new(&SentimentSettings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub sentiment: Sentiment,
    pub subject: String,
    pub body: String,
}

pub fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

impl NotificationEvent {
    /// Notification for a message with subject `message_subject`; the excerpt
    /// is taken from the original, non-lowered `body`.
    pub fn new(sentiment: Sentiment, message_subject: &str, body: &str) -> Self {
        Self {
            sentiment,
            subject: sentiment.notification_subject().to_string(),
            body: format!("Subject: {}\n\nExcerpt: {}...", message_subject, excerpt(body)),
        }
    }
}
