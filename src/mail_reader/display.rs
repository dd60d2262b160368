use crate::mail_reader::message::ScannedMessage;
use log::{debug, error, log_enabled, Level};

pub fn display_message(message: &ScannedMessage) {
    if !log_enabled!(Level::Debug) {
        return;
    }
    match serde_json::to_string_pretty(message) {
        Ok(json) => debug!("{}", json),
        Err(e) => error!("Error converting to JSON: {}", e),
    }
    debug!("---");
}
