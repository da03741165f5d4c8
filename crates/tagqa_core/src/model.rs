use std::fmt;

use chrono::{DateTime, Utc};

/// Language tag shared by keywords and URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LanguageCode {
    #[default]
    Tc,
    Sc,
    En,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 3] = [LanguageCode::Tc, LanguageCode::Sc, LanguageCode::En];

    pub fn code(self) -> &'static str {
        match self {
            LanguageCode::Tc => "tc",
            LanguageCode::Sc => "sc",
            LanguageCode::En => "en",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LanguageCode::Tc => "Traditional Chinese",
            LanguageCode::Sc => "Simplified Chinese",
            LanguageCode::En => "English",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.display_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub type SequenceNumber = u32;

/// An operator-defined substring pattern, scoped by language and sequence number.
///
/// Identity is `(text, language, sequence)`; the element id rides along and is
/// not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordSpec {
    pub text: String,
    pub language: LanguageCode,
    pub sequence: SequenceNumber,
    pub element_id: Option<String>,
}

impl KeywordSpec {
    pub fn new(text: impl Into<String>, language: LanguageCode, sequence: SequenceNumber) -> Self {
        Self {
            text: text.into(),
            language,
            sequence,
            element_id: None,
        }
    }

    /// Attaches the id of an element to click before capturing. Blank ids are dropped.
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        let element_id = element_id.into();
        let trimmed = element_id.trim();
        self.element_id = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn same_identity(&self, other: &KeywordSpec) -> bool {
        self.text == other.text
            && self.language == other.language
            && self.sequence == other.sequence
    }

    /// Whether this keyword is evaluated while `url` is under test.
    pub fn applies_to(&self, url: &UrlSpec) -> bool {
        self.language == url.language && self.sequence == url.sequence
    }
}

/// A page to sweep, tagged with the language and sequence its keywords share.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlSpec {
    pub url: String,
    pub language: LanguageCode,
    pub sequence: SequenceNumber,
}

impl UrlSpec {
    pub fn new(url: impl Into<String>, language: LanguageCode, sequence: SequenceNumber) -> Self {
        Self {
            url: url.into(),
            language,
            sequence,
        }
    }

    /// Host portion of the URL with dots replaced, e.g. `www_example_com`.
    pub fn host_label(&self) -> String {
        let after_scheme = match self.url.split_once("//") {
            Some((_, rest)) => rest,
            None => self.url.as_str(),
        };
        let host = after_scheme.split('/').next().unwrap_or_default();
        host.replace('.', "_")
    }
}

/// Keywords that apply to `url`, in keyword-list order.
pub fn relevant_keywords<'a>(keywords: &'a [KeywordSpec], url: &UrlSpec) -> Vec<&'a KeywordSpec> {
    keywords.iter().filter(|kw| kw.applies_to(url)).collect()
}

/// One captured network response. Never mutated after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEvent {
    pub resource_name: String,
    pub status_code: Option<u16>,
    pub method: String,
    pub resource_type: String,
    /// Value of the `content-length` header, when present and numeric.
    pub size_bytes: Option<u64>,
    pub captured_at: DateTime<Utc>,
    pub context_hash: String,
}

impl NetworkEvent {
    /// Last path segment of `url`, or the whole URL when that segment is empty.
    pub fn resource_name_for(url: &str) -> String {
        match url.rsplit('/').next() {
            Some(last) if !last.is_empty() => last.to_string(),
            _ => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_name_uses_last_segment() {
        assert_eq!(
            NetworkEvent::resource_name_for("https://cdn.example.com/img/a_keyword_1.png"),
            "a_keyword_1.png"
        );
        assert_eq!(
            NetworkEvent::resource_name_for("https://example.com/"),
            "https://example.com/"
        );
    }

    #[test]
    fn host_label_replaces_dots() {
        let url = UrlSpec::new("https://www.example.com/a/b", LanguageCode::En, 1);
        assert_eq!(url.host_label(), "www_example_com");
        let bare = UrlSpec::new("example.org", LanguageCode::En, 1);
        assert_eq!(bare.host_label(), "example_org");
    }

    #[test]
    fn language_codes_round_trip_through_names() {
        for lang in LanguageCode::ALL {
            assert_eq!(LanguageCode::from_code(lang.code()), Some(lang));
            assert_eq!(LanguageCode::from_display_name(lang.display_name()), Some(lang));
        }
        assert_eq!(LanguageCode::from_code("xx"), None);
    }

    #[test]
    fn relevance_requires_language_and_sequence() {
        let url = UrlSpec::new("https://example.com", LanguageCode::Sc, 2);
        let keywords = vec![
            KeywordSpec::new("a", LanguageCode::Sc, 2),
            KeywordSpec::new("b", LanguageCode::Sc, 1),
            KeywordSpec::new("c", LanguageCode::Tc, 2),
            KeywordSpec::new("d", LanguageCode::Sc, 2),
        ];
        let texts: Vec<_> = relevant_keywords(&keywords, &url)
            .into_iter()
            .map(|kw| kw.text.as_str())
            .collect();
        assert_eq!(texts, vec!["a", "d"]);
    }
}
