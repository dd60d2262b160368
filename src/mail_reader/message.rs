use anyhow::Result;
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};
use serde::{Serialize, Deserialize};
use log::{info, warn, error};

use crate::mail_reader::decoder::decode_bytes;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScannedMessage {
    pub id: u32,
    pub subject: String,
    pub body: String,
}

fn is_encoded_word(raw: &[u8]) -> bool {
    raw.windows(2).any(|pair| pair == b"=?")
}

// Drop the CRLF of folded header lines, keeping the whitespace that follows.
fn unfold(value: &str) -> String {
    value.replace("\r\n", "").replace('\n', "")
}

pub fn decode_subject(parsed_mail: &ParsedMail) -> String {
    let Some(header) = parsed_mail.headers.get_first_header("Subject") else {
        return String::new();
    };

    let raw = header.get_value_raw();
    if is_encoded_word(raw) {
        // RFC 2047 words carry their own charset
        header.get_value()
    } else {
        unfold(&decode_bytes(raw)).trim().to_string()
    }
}

fn walk_parts<'a, 'b>(part: &'a ParsedMail<'b>, out: &mut Vec<&'a ParsedMail<'b>>) {
    out.push(part);
    for subpart in &part.subparts {
        walk_parts(subpart, out);
    }
}

fn text_of_part(part: &ParsedMail) -> Result<String> {
    let content = part.get_body_raw()?;
    Ok(decode_bytes(&content))
}

/// Plain-text body of a message: the first non-empty `text/plain` part of a
/// multipart message, or the single payload otherwise.
pub fn extract_text_content(parsed_mail: &ParsedMail) -> String {
    if parsed_mail.subparts.is_empty() {
        return match text_of_part(parsed_mail) {
            Ok(text) => text,
            Err(e) => {
                error!("Error processing email body: {}", e);
                String::new()
            }
        };
    }

    let mut parts = Vec::new();
    walk_parts(parsed_mail, &mut parts);

    for part in parts {
        if !part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
            continue;
        }
        match text_of_part(part) {
            Ok(text) if !text.is_empty() => return text,
            Ok(_) => continue,
            Err(e) => {
                error!("Error processing email part: {}", e);
                continue;
            }
        }
    }

    warn!("No text/plain content found");
    String::new()
}

pub fn process_message(id: u32, raw: &[u8]) -> Result<ScannedMessage> {
    let parsed_mail = parse_mail(raw)?;

    let subject = decode_subject(&parsed_mail);
    info!("Processing email: {}", subject);

    let body = extract_text_content(&parsed_mail);

    Ok(ScannedMessage { id, subject, body })
}
