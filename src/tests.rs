use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::notifier::{Notify, SmtpNotifier};
use crate::scanner::{select_recent, Mailbox, ScanSummary, Scanner};
use crate::sentiment_filter::{excerpt, KeywordSet, NotificationEvent, Sentiment, SentimentFilter};
use crate::settings::{Config, Credentials, ImapConfig, SmtpConfig};

fn test_config() -> Config {
    Config {
        credentials: Credentials {
            username: "watcher@example.com".to_string(),
            password: "secret".to_string(),
        },
        notification_email: "alerts@example.com".to_string(),
        imap: ImapConfig {
            server: "127.0.0.1".to_string(),
            port: 1,
        },
        smtp: SmtpConfig {
            server: "127.0.0.1".to_string(),
            port: 1,
        },
        max_emails: 10,
        filter: SentimentFilter::default(),
    }
}

fn raw_mail(subject: &str, body: &str) -> Vec<u8> {
    format!(
        "Subject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
        subject, body
    )
    .into_bytes()
}

#[derive(Default)]
struct FakeMailbox {
    unseen: Option<Vec<u32>>,
    messages: HashMap<u32, Vec<u8>>,
    fetched: Vec<u32>,
    released: bool,
}

impl FakeMailbox {
    fn with_unseen(ids: Vec<u32>) -> Self {
        Self {
            unseen: Some(ids),
            ..Default::default()
        }
    }

    fn message(mut self, id: u32, raw: Vec<u8>) -> Self {
        self.messages.insert(id, raw);
        self
    }
}

impl Mailbox for FakeMailbox {
    async fn unseen(&mut self) -> Result<Vec<u32>> {
        self.unseen.clone().ok_or_else(|| anyhow!("SEARCH failed"))
    }

    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>> {
        self.fetched.push(id);
        self.messages
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("FETCH {} failed", id))
    }

    async fn release(&mut self) {
        self.released = true;
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<(String, String)>>,
}

impl Notify for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        self.sent.borrow_mut().push((subject.to_string(), body.to_string()));
    }
}

#[tokio::test]
async fn twelve_unseen_messages_only_ten_most_recent_are_fetched() {
    let config = test_config();
    let notifier = RecordingNotifier::default();
    let mut mailbox = FakeMailbox::with_unseen(vec![12, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    for id in 1..=12 {
        mailbox = mailbox.message(id, raw_mail("Hallo", "Nichts Besonderes"));
    }

    let summary = Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    assert_eq!(mailbox.fetched, (3..=12).collect::<Vec<_>>());
    assert_eq!(summary.selected, 10);
    assert_eq!(summary.processed, 10);
    assert!(mailbox.released);
    assert!(notifier.sent.borrow().is_empty());
}

#[tokio::test]
async fn leider_triggers_one_negative_notification_with_capped_excerpt() {
    let config = test_config();
    let notifier = RecordingNotifier::default();
    let body = format!("Leider müssen wir Ihnen mitteilen, {}", "x".repeat(800));
    let mut mailbox = FakeMailbox::with_unseen(vec![1]).message(1, raw_mail("Absage", &body));

    let summary = Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    let sent = notifier.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(summary.notifications, 1);
    let (subject, text) = &sent[0];
    assert_eq!(subject, "Negative Email Detected");
    let expected_excerpt: String = body.chars().take(500).collect();
    assert_eq!(text, &format!("Subject: Absage\n\nExcerpt: {}...", expected_excerpt));
    assert!(text.contains("Leider"));
}

#[tokio::test]
async fn body_with_both_categories_triggers_both_notifications() {
    let config = test_config();
    let notifier = RecordingNotifier::default();
    let body = "Die Zusage für Projekt A, Projekt B wurde abgelehnt.";
    let mut mailbox = FakeMailbox::with_unseen(vec![4]).message(4, raw_mail("Status", body));

    Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    let subjects: Vec<String> = notifier.sent.borrow().iter().map(|(s, _)| s.clone()).collect();
    assert_eq!(subjects, vec!["Negative Email Detected", "Positive Email Detected"]);
}

#[tokio::test]
async fn failed_fetch_does_not_stop_the_batch() {
    let config = test_config();
    let notifier = RecordingNotifier::default();
    // id 2 has no message behind it, so its fetch fails
    let mut mailbox = FakeMailbox::with_unseen(vec![1, 2, 3])
        .message(1, raw_mail("Eins", "willkommen"))
        .message(3, raw_mail("Drei", "erfolgreich abgeschlossen"));

    let summary = Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    assert_eq!(mailbox.fetched, vec![1, 2, 3]);
    assert_eq!(
        summary,
        ScanSummary {
            selected: 3,
            processed: 2,
            skipped: 1,
            notifications: 2,
        }
    );
}

#[tokio::test]
async fn malformed_messages_do_not_stop_later_ones() {
    let config = test_config();
    let notifier = RecordingNotifier::default();
    let broken_part = b"Subject: leider\r\n\
Content-Type: text/plain\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
@@@@ leider @@@@\r\n"
        .to_vec();
    let mut mailbox = FakeMailbox::with_unseen(vec![1, 2, 3, 4])
        .message(1, raw_mail("Eins", "Zusage erteilt"))
        // headers may not start with a space, so this one fails to parse
        .message(2, b" leider\r\n\r\nleider\r\n".to_vec())
        .message(3, broken_part)
        .message(4, raw_mail("Vier", "Leider abgelehnt"));

    let summary = Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    assert_eq!(mailbox.fetched, vec![1, 2, 3, 4]);
    assert_eq!(
        summary,
        ScanSummary {
            selected: 4,
            processed: 3,
            skipped: 1,
            notifications: 2,
        }
    );
    let sent = notifier.sent.borrow();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "Positive Email Detected");
    assert_eq!(sent[1].0, "Negative Email Detected");
    assert!(sent[1].1.starts_with("Subject: Vier\n\n"));
}

#[tokio::test]
async fn failed_search_releases_mailbox_without_fetching() {
    let config = test_config();
    let notifier = RecordingNotifier::default();
    let mut mailbox = FakeMailbox::default();

    let summary = Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    assert_eq!(summary, ScanSummary::default());
    assert!(mailbox.fetched.is_empty());
    assert!(mailbox.released);
}

#[tokio::test]
async fn undeliverable_notifications_do_not_abort_the_batch() {
    let config = test_config();
    // Nothing listens on 127.0.0.1:1, every send fails
    let notifier = SmtpNotifier::new(&config);
    let mut mailbox = FakeMailbox::with_unseen(vec![1, 2])
        .message(1, raw_mail("A", "leider nein"))
        .message(2, raw_mail("B", "herzlichen Glückwunsch"));

    let summary = Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.notifications, 2);
    assert!(mailbox.released);
}

#[tokio::test]
async fn empty_body_is_not_scanned() {
    let config = test_config();
    let notifier = RecordingNotifier::default();
    let mut mailbox = FakeMailbox::with_unseen(vec![1]).message(1, b"Subject: leider\r\n\r\n".to_vec());

    let summary = Scanner::new(&config, &notifier).scan_mailbox(&mut mailbox).await;

    assert_eq!(summary.processed, 1);
    assert!(notifier.sent.borrow().is_empty());
}

#[tokio::test]
async fn unreachable_server_ends_scan_quietly() {
    let config = test_config();
    let notifier = RecordingNotifier::default();

    let summary = Scanner::new(&config, &notifier).scan().await;

    assert_eq!(summary, ScanSummary::default());
}

#[test]
fn select_recent_keeps_newest_in_server_order() {
    assert_eq!(select_recent(vec![5, 1, 3], 10), vec![1, 3, 5]);
    assert_eq!(select_recent(vec![9, 2, 7, 4], 2), vec![7, 9]);
    assert!(select_recent(vec![], 10).is_empty());
}

#[test]
fn keyword_sets_are_lower_cased_and_skip_blanks() {
    let set = KeywordSet::new(["Leider", "  ", "NICHT Möglich"]);
    assert_eq!(set.keywords(), ["leider".to_string(), "nicht möglich".to_string()]);
}

#[test]
fn keyword_padding_is_kept() {
    let set = KeywordSet::new([" Ja "]);
    assert_eq!(set.keywords(), [" ja ".to_string()]);
    assert!(set.matches("na ja gut"));
    assert!(!set.matches("jawohl"));
}

#[test]
fn classify_matches_case_insensitively() {
    let filter = SentimentFilter::default();
    assert_eq!(filter.classify("LEIDER nicht"), vec![Sentiment::Negative]);
    assert_eq!(filter.classify("Herzlichen Glückwunsch!"), vec![Sentiment::Positive]);
    assert!(filter.classify("Guten Tag").is_empty());
}

#[test]
fn excerpt_counts_characters_not_bytes() {
    let body = "ü".repeat(600);
    assert_eq!(excerpt(&body).chars().count(), 500);
    assert_eq!(excerpt("kurz"), "kurz");
}

#[test]
fn notification_event_quotes_original_body() {
    let event = NotificationEvent::new(Sentiment::Positive, "Bewerbung", "ZUSAGE erteilt");
    assert_eq!(event.subject, "Positive Email Detected");
    assert_eq!(event.body, "Subject: Bewerbung\n\nExcerpt: ZUSAGE erteilt...");
}
