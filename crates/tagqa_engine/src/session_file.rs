use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::engine_warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use tagqa_core::{KeywordSpec, LanguageCode, SequenceNumber, UrlSpec};

use crate::persist::{ArtifactWriter, PersistError};

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("there are no keywords to save")]
    NoKeywords,
    #[error("session file is not a JSON object")]
    NotAnObject,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid session JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// What a session file held. `skipped` counts records that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionContents {
    pub urls: Vec<UrlSpec>,
    pub keywords: Vec<KeywordSpec>,
    pub skipped: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct UrlRecord {
    url: String,
    lang: String,
    #[serde(default = "first_sequence")]
    num: SequenceNumber,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeywordRecord {
    text: String,
    lang: String,
    #[serde(default = "first_sequence")]
    num: SequenceNumber,
    #[serde(default)]
    button_id: String,
}

#[derive(Debug, Serialize)]
struct SessionDocument {
    urls: Vec<UrlRecord>,
    keywords: Vec<KeywordRecord>,
}

fn first_sequence() -> SequenceNumber {
    1
}

/// Serializes both lists. Refuses a session without keywords.
pub fn encode_session(urls: &[UrlSpec], keywords: &[KeywordSpec]) -> Result<String, SessionFileError> {
    if keywords.is_empty() {
        return Err(SessionFileError::NoKeywords);
    }
    let document = SessionDocument {
        urls: urls
            .iter()
            .map(|url| UrlRecord {
                url: url.url.clone(),
                lang: url.language.code().to_string(),
                num: url.sequence,
            })
            .collect(),
        keywords: keywords
            .iter()
            .map(|kw| KeywordRecord {
                text: kw.text.clone(),
                lang: kw.language.code().to_string(),
                num: kw.sequence,
                button_id: kw.element_id.clone().unwrap_or_default(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Reads the current layout and every older one.
///
/// Accepted: records without `num` or `button_id`, bare strings in either
/// list, and the single-URL `{"url": "..."}` document. Records that still
/// cannot be read are skipped with a warning.
pub fn decode_session(text: &str) -> Result<SessionContents, SessionFileError> {
    let root: Value = serde_json::from_str(text)?;
    let object = root.as_object().ok_or(SessionFileError::NotAnObject)?;
    let mut contents = SessionContents::default();

    match object.get("urls") {
        Some(Value::Array(items)) => {
            for item in items {
                match decode_url(item) {
                    Some(url) => contents.urls.push(url),
                    None => {
                        engine_warn!("Skipping unreadable URL record {}", item);
                        contents.skipped += 1;
                    }
                }
            }
        }
        _ => {
            if let Some(Value::String(url)) = object.get("url") {
                contents.urls.push(UrlSpec::new(url.trim(), LanguageCode::Tc, 1));
            }
        }
    }

    if let Some(Value::Array(items)) = object.get("keywords") {
        for item in items {
            match decode_keyword(item) {
                Some(keyword)
                    if contents
                        .keywords
                        .iter()
                        .any(|listed| listed.same_identity(&keyword)) =>
                {
                    engine_warn!("Skipping duplicate keyword record {}", item);
                    contents.skipped += 1;
                }
                Some(keyword) => contents.keywords.push(keyword),
                None => {
                    engine_warn!("Skipping unreadable keyword record {}", item);
                    contents.skipped += 1;
                }
            }
        }
    }

    Ok(contents)
}

fn decode_url(item: &Value) -> Option<UrlSpec> {
    let url = match item {
        Value::String(url) => UrlSpec::new(url.trim(), LanguageCode::Tc, 1),
        Value::Object(_) => {
            let record: UrlRecord = serde_json::from_value(item.clone()).ok()?;
            UrlSpec::new(record.url.trim(), LanguageCode::from_code(&record.lang)?, record.num)
        }
        _ => return None,
    };
    (!url.url.is_empty() && url.sequence > 0).then_some(url)
}

fn decode_keyword(item: &Value) -> Option<KeywordSpec> {
    let keyword = match item {
        Value::String(text) => KeywordSpec::new(text.trim(), LanguageCode::Tc, 1),
        Value::Object(_) => {
            let record: KeywordRecord = serde_json::from_value(item.clone()).ok()?;
            let language = LanguageCode::from_code(&record.lang)?;
            KeywordSpec::new(record.text.trim(), language, record.num)
                .with_element_id(record.button_id)
        }
        _ => return None,
    };
    (!keyword.text.is_empty() && keyword.sequence > 0).then_some(keyword)
}

pub fn save_session(
    dir: &Path,
    filename: &str,
    urls: &[UrlSpec],
    keywords: &[KeywordSpec],
) -> Result<PathBuf, SessionFileError> {
    let json = encode_session(urls, keywords)?;
    Ok(ArtifactWriter::new(dir.to_path_buf()).store_text(filename, &json)?)
}

pub fn load_session(path: &Path) -> Result<SessionContents, SessionFileError> {
    let text = fs::read_to_string(path)?;
    decode_session(&text)
}
