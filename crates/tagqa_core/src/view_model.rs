use crate::editor::PasteStats;
use crate::{KeywordStatus, NetworkEvent, RunPhase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub run: RunPhase,
    pub status_line: String,
    pub keyword_rows: Vec<KeywordRowView>,
    pub url_rows: Vec<String>,
    pub visible_log: Vec<NetworkEvent>,
    pub log_len: usize,
    pub active_filter: Option<String>,
    pub report_row_count: usize,
    pub can_undo_keywords: bool,
    pub can_redo_keywords: bool,
    pub can_undo_urls: bool,
    pub can_redo_urls: bool,
    pub last_paste_stats: Option<PasteStats>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRowView {
    pub index: usize,
    pub text: String,
    pub status: KeywordStatus,
    pub selected: bool,
}
