use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::{Credentials as SmtpCredentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info};

use crate::settings::Config;

/// Outbound side of a scan. Implementations log their own failures, a lost
/// notification never interrupts the caller.
#[allow(async_fn_in_trait)]
pub trait Notify {
    async fn notify(&self, subject: &str, body: &str);
}

/// Sends notifications as plain-text mail through an SMTP relay with STARTTLS.
pub struct SmtpNotifier<'a> {
    config: &'a Config,
}

impl<'a> SmtpNotifier<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn build_message(&self, subject: &str, body: &str) -> Result<Message> {
        let message = Message::builder()
            .from(self.config.credentials.username.parse()?)
            .to(self.config.notification_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        Ok(message)
    }

    pub async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(subject, body)?;

        let credentials = SmtpCredentials::new(
            self.config.credentials.username.clone(),
            self.config.credentials.password.clone(),
        );
        // Unpooled: the connection is opened for this message and closed after it
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp.server)?
            .port(self.config.smtp.port)
            .credentials(credentials)
            .authentication(vec![Mechanism::Plain, Mechanism::Login])
            .build();

        transport.send(message).await?;
        Ok(())
    }
}

impl Notify for SmtpNotifier<'_> {
    async fn notify(&self, subject: &str, body: &str) {
        match self.send(subject, body).await {
            Ok(()) => info!("Notification sent: {}", subject),
            Err(e) => error!("Error sending notification: {}", e),
        }
    }
}
