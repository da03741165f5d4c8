use chrono::{DateTime, TimeZone};
use sha2::{Digest, Sha256};

use tagqa_core::UrlSpec;

/// `capture_{host}_{keyword}_{YYYYmmddHHMMSS}.png`, with the host's dots and
/// the keyword's spaces and path separators replaced by `_`.
pub fn capture_filename<Tz>(url: &UrlSpec, keyword_text: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "capture_{}_{}_{}.png",
        url.host_label(),
        sanitize_component(keyword_text),
        at.format("%Y%m%d%H%M%S")
    )
}

/// `{prefix}_{YYYYmmdd_HHMMSS}.{extension}`
pub fn timestamped_filename<Tz>(prefix: &str, extension: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix}_{}.{extension}", at.format("%Y%m%d_%H%M%S"))
}

/// First eight hex digits of the SHA-256 of `input`.
pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|c| if c == ' ' || is_forbidden(c) { '_' } else { c })
        .collect()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
