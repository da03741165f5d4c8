use std::time::Duration;

use crate::display::{keyword_row, url_row};
use crate::editor::{EditableList, PasteStats};
use crate::history::{KEYWORD_HISTORY_DEPTH, URL_HISTORY_DEPTH};
use crate::log_store::{LogStore, DEFAULT_DEBOUNCE};
use crate::matcher::{recompute, KeywordMatchIndex};
use crate::report::ReportAssembler;
use crate::view_model::{AppViewModel, KeywordRowView};
use crate::{KeywordSpec, KeywordStatus, NetworkEvent, ReportRow, UrlSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreSettings {
    pub debounce: Duration,
    pub keyword_history_depth: usize,
    pub url_history_depth: usize,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            keyword_history_depth: KEYWORD_HISTORY_DEPTH,
            url_history_depth: URL_HISTORY_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    /// Sweeping URL `current` (1-based) of `total`.
    Running { current: usize, total: usize },
    ElementSweep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        urls_total: usize,
        /// `(url, reason)` for every URL whose browser could not be launched or navigated.
        urls_failed: Vec<(String, String)>,
    },
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    keywords: EditableList<KeywordSpec>,
    urls: EditableList<UrlSpec>,
    log: LogStore,
    matches: KeywordMatchIndex,
    active_filter: Option<String>,
    run: RunPhase,
    report_rows: Vec<ReportRow>,
    failed_urls: Vec<(String, String)>,
    last_outcome: Option<RunOutcome>,
    last_paste: Option<PasteStats>,
    status_line: String,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(CoreSettings::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: CoreSettings) -> Self {
        Self {
            keywords: EditableList::new(settings.keyword_history_depth),
            urls: EditableList::new(settings.url_history_depth),
            log: LogStore::new(settings.debounce),
            matches: KeywordMatchIndex::default(),
            active_filter: None,
            run: RunPhase::Idle,
            report_rows: Vec::new(),
            failed_urls: Vec::new(),
            last_outcome: None,
            last_paste: None,
            status_line: "Ready".to_string(),
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        let keyword_rows = self
            .keywords
            .items()
            .iter()
            .enumerate()
            .map(|(index, keyword)| {
                let status = self.matches.status_of(&keyword.text);
                KeywordRowView {
                    index,
                    text: keyword_row(keyword, status),
                    status,
                    selected: self.active_filter.as_deref() == Some(keyword.text.as_str()),
                }
            })
            .collect();

        AppViewModel {
            run: self.run,
            status_line: self.status_line.clone(),
            keyword_rows,
            url_rows: self.urls.items().iter().map(url_row).collect(),
            visible_log: self.visible_events().into_iter().cloned().collect(),
            log_len: self.log.len(),
            active_filter: self.active_filter.clone(),
            report_row_count: self.report_rows.len(),
            can_undo_keywords: self.keywords.can_undo(),
            can_redo_keywords: self.keywords.can_redo(),
            can_undo_urls: self.urls.can_undo(),
            can_redo_urls: self.urls.can_redo(),
            last_paste_stats: self.last_paste,
            dirty: self.dirty,
        }
    }

    pub fn keywords(&self) -> &[KeywordSpec] {
        self.keywords.items()
    }

    pub fn urls(&self) -> &[UrlSpec] {
        self.urls.items()
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    pub fn matches(&self) -> &KeywordMatchIndex {
        &self.matches
    }

    pub fn status_of(&self, keyword_text: &str) -> KeywordStatus {
        self.matches.status_of(keyword_text)
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.active_filter.as_deref()
    }

    pub fn run_phase(&self) -> RunPhase {
        self.run
    }

    pub fn last_outcome(&self) -> Option<&RunOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn report_rows(&self) -> &[ReportRow] {
        &self.report_rows
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// The whole log, or only the active keyword's matches.
    pub fn visible_events(&self) -> Vec<&NetworkEvent> {
        let log = self.log.snapshot();
        match self.active_filter.as_deref() {
            Some(text) => self
                .matches
                .get(text)
                .map(|m| m.events(log).collect())
                .unwrap_or_default(),
            None => log.iter().collect(),
        }
    }

    /// Report rows ordered against the current keyword and URL lists.
    pub fn assembled_report(&self) -> Vec<ReportRow> {
        ReportAssembler::new(self.keywords.items(), self.urls.items())
            .assemble(self.report_rows.clone())
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.run != RunPhase::Idle
    }

    pub(crate) fn keyword_list_mut(&mut self) -> &mut EditableList<KeywordSpec> {
        &mut self.keywords
    }

    pub(crate) fn url_list_mut(&mut self) -> &mut EditableList<UrlSpec> {
        &mut self.urls
    }

    pub(crate) fn log_mut(&mut self) -> &mut LogStore {
        &mut self.log
    }

    pub(crate) fn set_last_paste(&mut self, stats: PasteStats) {
        self.last_paste = Some(stats);
        self.mark_dirty();
    }

    pub(crate) fn set_status(&mut self, line: impl Into<String>) {
        self.status_line = line.into();
        self.mark_dirty();
    }

    /// Full rebuild of the match index from the current log and keyword list.
    pub(crate) fn refresh_matches(&mut self) {
        self.matches = recompute(self.log.snapshot(), self.keywords.items());
        self.mark_dirty();
    }

    pub(crate) fn set_filter(&mut self, filter: Option<String>) {
        self.active_filter = filter;
        self.mark_dirty();
    }

    pub(crate) fn begin_run(&mut self, total: usize) {
        self.run = RunPhase::Running { current: 0, total };
        self.report_rows.clear();
        self.failed_urls.clear();
        self.last_outcome = None;
        self.mark_dirty();
    }

    pub(crate) fn begin_sweep(&mut self) {
        self.run = RunPhase::ElementSweep;
        self.last_outcome = None;
        self.mark_dirty();
    }

    /// Resets the log and matching state for the next URL.
    pub(crate) fn enter_url(&mut self, current: usize, total: usize) {
        if let RunPhase::Running { .. } = self.run {
            self.run = RunPhase::Running { current, total };
        }
        self.log.clear();
        self.active_filter = None;
        self.refresh_matches();
    }

    pub(crate) fn push_row(&mut self, row: ReportRow) {
        self.report_rows.push(row);
        self.mark_dirty();
    }

    pub(crate) fn record_failed_url(&mut self, url: String, reason: String) {
        self.failed_urls.push((url, reason));
        self.mark_dirty();
    }

    /// URLs the current or last run could not test, with the reason.
    pub fn failed_urls(&self) -> &[(String, String)] {
        &self.failed_urls
    }

    pub(crate) fn finish_run(&mut self, outcome: RunOutcome) {
        self.run = RunPhase::Idle;
        self.last_outcome = Some(outcome);
        self.mark_dirty();
    }

    pub(crate) fn finish_sweep(&mut self) {
        self.run = RunPhase::Idle;
        self.mark_dirty();
    }
}
