use std::collections::HashMap;
use std::path::PathBuf;

use crate::{KeywordSpec, KeywordStatus, LanguageCode, UrlSpec};

/// One (url, keyword) capture. Rows live for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub keyword_text: String,
    pub language: LanguageCode,
    pub url: String,
    pub status: KeywordStatus,
    /// Where the capture was written. The file may be missing if the capture failed.
    pub screenshot_path: PathBuf,
}

/// Orders rows by keyword position, then URL position, in the current lists.
///
/// Unknown keywords and URLs rank after every known one. When a text or URL
/// appears more than once, its last position is used.
#[derive(Debug, Clone)]
pub struct ReportAssembler<'a> {
    keyword_rank: HashMap<&'a str, usize>,
    url_rank: HashMap<&'a str, usize>,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(keywords: &'a [KeywordSpec], urls: &'a [UrlSpec]) -> Self {
        let keyword_rank = keywords
            .iter()
            .enumerate()
            .map(|(pos, kw)| (kw.text.as_str(), pos))
            .collect();
        let url_rank = urls
            .iter()
            .enumerate()
            .map(|(pos, url)| (url.url.as_str(), pos))
            .collect();
        Self {
            keyword_rank,
            url_rank,
        }
    }

    pub fn rank(&self, row: &ReportRow) -> (usize, usize) {
        (
            self.keyword_rank
                .get(row.keyword_text.as_str())
                .copied()
                .unwrap_or(usize::MAX),
            self.url_rank
                .get(row.url.as_str())
                .copied()
                .unwrap_or(usize::MAX),
        )
    }

    /// Stable sort: rows with equal rank keep their capture order.
    pub fn assemble(&self, mut rows: Vec<ReportRow>) -> Vec<ReportRow> {
        rows.sort_by_key(|row| self.rank(row));
        rows
    }
}
