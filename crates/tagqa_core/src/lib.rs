//! Tag QA core: pure domain model, keyword matching and the foreground state machine.
pub mod display;
mod editor;
mod effect;
mod history;
mod log_store;
mod matcher;
mod model;
mod msg;
mod report;
mod state;
mod status;
mod update;
mod view_model;

pub use editor::{pasted_lines, EditError, EditableList, ListRecord, PasteStats};
pub use effect::{Effect, Severity};
pub use history::{SessionHistory, KEYWORD_HISTORY_DEPTH, URL_HISTORY_DEPTH};
pub use log_store::{CollapsingScheduler, LogStore, DEFAULT_DEBOUNCE};
pub use matcher::{recompute, KeywordMatch, KeywordMatchIndex};
pub use model::{
    relevant_keywords, KeywordSpec, LanguageCode, NetworkEvent, SequenceNumber, UrlSpec,
};
pub use msg::Msg;
pub use report::{ReportAssembler, ReportRow};
pub use state::{AppState, CoreSettings, RunOutcome, RunPhase};
pub use status::{derive_status, KeywordStatus};
pub use update::update;
pub use view_model::{AppViewModel, KeywordRowView};
