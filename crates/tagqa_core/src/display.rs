//! Text form of list rows: `[num] [lang] text {element_id} (STATUS)`.
//!
//! Rows are rendered from structured records and parsed back only at the
//! clipboard/persistence boundary. Parsing never fails: unrecognised input
//! falls back to older layouts and finally to the raw text.

use crate::{KeywordSpec, KeywordStatus, LanguageCode, UrlSpec};

pub fn keyword_row(keyword: &KeywordSpec, status: KeywordStatus) -> String {
    let mut row = format!(
        "[{}] [{}] {}",
        keyword.sequence, keyword.language, keyword.text
    );
    if let Some(id) = &keyword.element_id {
        row.push_str(&format!(" {{{id}}}"));
    }
    if let Some(suffix) = status.row_suffix() {
        row.push_str(&format!(" ({suffix})"));
    }
    row
}

pub fn url_row(url: &UrlSpec) -> String {
    format!("[{}] [{}] {}", url.sequence, url.language, url.url)
}

pub fn parse_keyword_row(row: &str) -> KeywordSpec {
    parse_current_keyword(row)
        .or_else(|| parse_legacy_keyword(row))
        .unwrap_or_else(|| KeywordSpec::new(strip_status(row).trim(), LanguageCode::Tc, 1))
}

pub fn parse_url_row(row: &str) -> UrlSpec {
    match split_prefix(row) {
        Some((sequence, language, rest)) => UrlSpec::new(rest.trim(), language, sequence),
        None => UrlSpec::new(row.trim(), LanguageCode::Tc, 1),
    }
}

fn parse_current_keyword(row: &str) -> Option<KeywordSpec> {
    let (sequence, language, rest) = split_prefix(row)?;
    let keyword = match rest.split_once(" {") {
        Some((text, remainder)) if remainder.contains('}') => {
            let id = remainder.split('}').next().unwrap_or_default();
            KeywordSpec::new(text.trim(), language, sequence).with_element_id(id)
        }
        _ => KeywordSpec::new(strip_status(rest).trim(), language, sequence),
    };
    Some(keyword)
}

// `[lang] text (status)`
fn parse_legacy_keyword(row: &str) -> Option<KeywordSpec> {
    let (lang_part, text_part) = row.strip_prefix('[')?.split_once("] ")?;
    let language = LanguageCode::from_code(lang_part)
        .or_else(|| LanguageCode::from_display_name(lang_part))
        .unwrap_or_default();
    Some(KeywordSpec::new(strip_status(text_part).trim(), language, 1))
}

/// Splits `[num] [lang] rest`.
fn split_prefix(row: &str) -> Option<(u32, LanguageCode, &str)> {
    let (num_part, rest) = row.split_once("] [")?;
    let sequence = num_part.strip_prefix('[')?.trim().parse::<u32>().ok()?;
    let (lang_part, rest) = rest.split_once("] ")?;
    let language = LanguageCode::from_code(lang_part).unwrap_or_default();
    Some((sequence, language, rest))
}

fn strip_status(text: &str) -> &str {
    text.split(" (").next().unwrap_or(text)
}
