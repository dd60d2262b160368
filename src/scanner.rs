use anyhow::Result;
use log::{error, info, warn};

use crate::mail_reader::display::display_message;
use crate::mail_reader::imap::ImapMailbox;
use crate::mail_reader::message::{process_message, ScannedMessage};
use crate::notifier::Notify;
use crate::sentiment_filter::NotificationEvent;
use crate::settings::Config;

/// A selected mailbox the scanner reads unseen messages from.
#[allow(async_fn_in_trait)]
pub trait Mailbox {
    /// Sequence numbers of messages without the seen flag.
    async fn unseen(&mut self) -> Result<Vec<u32>>;
    /// The full RFC 822 message. Fetching marks it seen.
    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>>;
    /// Close and log out; errors are swallowed.
    async fn release(&mut self);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub selected: usize,
    pub processed: usize,
    pub skipped: usize,
    pub notifications: usize,
}

// Keep the `max` most recent ids, in server (ascending) order.
pub fn select_recent(mut ids: Vec<u32>, max: usize) -> Vec<u32> {
    ids.sort_unstable();
    let start = ids.len().saturating_sub(max);
    ids.split_off(start)
}

pub struct Scanner<'a, N> {
    config: &'a Config,
    notifier: &'a N,
}

impl<'a, N: Notify> Scanner<'a, N> {
    pub fn new(config: &'a Config, notifier: &'a N) -> Self {
        Self { config, notifier }
    }

    /// Connect to the configured IMAP server and scan its inbox once.
    pub async fn scan(&self) -> ScanSummary {
        info!("Connecting to email server...");
        let mut mailbox = match ImapMailbox::open(&self.config.imap, &self.config.credentials).await {
            Ok(mailbox) => mailbox,
            Err(e) => {
                error!("Error connecting to email server: {}", e);
                return ScanSummary::default();
            }
        };

        let summary = self.scan_mailbox(&mut mailbox).await;
        info!("Email check completed. Connection closed.");
        summary
    }

    /// Scan an already opened mailbox, then release it.
    pub async fn scan_mailbox<M: Mailbox>(&self, mailbox: &mut M) -> ScanSummary {
        let summary = self.process_unseen(mailbox).await;
        mailbox.release().await;
        info!(
            "Scan finished: {} selected, {} processed, {} skipped, {} notifications",
            summary.selected, summary.processed, summary.skipped, summary.notifications
        );
        summary
    }

    async fn process_unseen<M: Mailbox>(&self, mailbox: &mut M) -> ScanSummary {
        let mut summary = ScanSummary::default();

        let ids = match mailbox.unseen().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Unseen search failed: {}", e);
                info!("No new emails.");
                return summary;
            }
        };

        let ids = select_recent(ids, self.config.max_emails);
        summary.selected = ids.len();
        info!("Processing last {} unread emails...", ids.len());

        for id in ids {
            info!("Checking email ID: {}", id);
            let message = match self.read_message(mailbox, id).await {
                Ok(message) => message,
                Err(e) => {
                    error!("Error processing email {}: {}", id, e);
                    summary.skipped += 1;
                    continue;
                }
            };
            display_message(&message);

            summary.notifications += self.notify_matches(&message).await;
            summary.processed += 1;
        }

        summary
    }

    async fn read_message<M: Mailbox>(&self, mailbox: &mut M, id: u32) -> Result<ScannedMessage> {
        let raw = mailbox.fetch(id).await?;
        process_message(id, &raw)
    }

    /// Send one notification per matching category, returning how many were sent.
    async fn notify_matches(&self, message: &ScannedMessage) -> usize {
        if message.body.is_empty() {
            return 0;
        }

        let matches = self.config.filter.classify(&message.body);
        for sentiment in &matches {
            info!("{} email detected: {}", sentiment.label(), message.subject);
            let event = NotificationEvent::new(*sentiment, &message.subject, &message.body);
            self.notifier.notify(&event.subject, &event.body).await;
        }
        matches.len()
    }
}
