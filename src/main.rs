mod logging;
mod mail_reader;
mod notifier;
mod scanner;
mod sentiment_filter;
mod settings;

#[cfg(test)]
mod tests;

use log::{debug, error, warn};

use crate::notifier::SmtpNotifier;
use crate::scanner::Scanner;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // A missing .env is fine, the variables may come from the real environment
    let _ = dotenvy::dotenv();
    if let Err(e) = logging::setup_logger(logging::level_from_env()) {
        eprintln!("Cannot initialise logging: {}", e);
    }

    let config = match settings::load_settings() {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            warn!("Please set up your environment variables first!");
            return;
        }
    };

    debug!(
        "Watching for {} negative and {} positive keywords",
        config.filter.negative.keywords().len(),
        config.filter.positive.keywords().len()
    );

    let notifier = SmtpNotifier::new(&config);
    Scanner::new(&config, &notifier).scan().await;
}
