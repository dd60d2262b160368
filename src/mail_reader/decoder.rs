use chardetng::EncodingDetector;
use encoding_rs::{Encoding, WINDOWS_1252};
use log::debug;

/// Single-byte encodings tried, in this order, once UTF-8 and detection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Latin1,
    Iso8859_1,
    Cp1252,
    Windows1252,
}

pub const FALLBACKS: [Fallback; 4] = [
    Fallback::Latin1,
    Fallback::Iso8859_1,
    Fallback::Cp1252,
    Fallback::Windows1252,
];

impl Fallback {
    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            // Every byte maps onto the code point with the same value.
            Fallback::Latin1 | Fallback::Iso8859_1 => {
                Some(bytes.iter().map(|&b| char::from(b)).collect())
            }
            Fallback::Cp1252 | Fallback::Windows1252 => decode_strict(WINDOWS_1252, bytes),
        }
    }
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Best-effort conversion of raw message bytes to text.
///
/// Tries strict UTF-8, then the encoding guessed by statistical detection,
/// then the fixed [`FALLBACKS`] list. Returns an empty string for missing or
/// empty input and when every attempt fails; it never errors.
pub fn decode(content: Option<&[u8]>) -> String {
    let bytes = match content {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return String::new(),
    };

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let detected = detect_encoding(bytes);
    if let Some(text) = decode_strict(detected, bytes) {
        debug!("Decoded {} bytes as {}", bytes.len(), detected.name());
        return text;
    }

    for fallback in FALLBACKS {
        if let Some(text) = fallback.decode(bytes) {
            debug!("Decoded {} bytes with fallback {:?}", bytes.len(), fallback);
            return text;
        }
    }

    String::new()
}

pub fn decode_bytes(content: &[u8]) -> String {
    decode(Some(content))
}
