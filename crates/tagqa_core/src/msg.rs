use std::time::Instant;

use crate::{KeywordSpec, LanguageCode, NetworkEvent, ReportRow, RunOutcome, SequenceNumber, UrlSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator added a keyword from the input fields.
    KeywordAdded(KeywordSpec),
    /// Operator edited the keyword at `index` in place.
    KeywordEdited { index: usize, keyword: KeywordSpec },
    KeywordRemoved { index: usize },
    KeywordsCleared,
    /// Clipboard paste into the keyword list; one keyword per line.
    KeywordsPasted {
        raw: String,
        language: LanguageCode,
        sequence: SequenceNumber,
    },
    KeywordUndo,
    KeywordRedo,
    /// Operator clicked the keyword list; `None` is a click on empty space.
    KeywordClicked { index: Option<usize> },
    UrlAdded(UrlSpec),
    UrlEdited { index: usize, url: UrlSpec },
    UrlRemoved { index: usize },
    UrlsPasted {
        raw: String,
        language: LanguageCode,
        sequence: SequenceNumber,
    },
    UrlUndo,
    UrlRedo,
    /// A session file was read.
    SessionLoaded {
        urls: Vec<UrlSpec>,
        keywords: Vec<KeywordSpec>,
    },
    SaveSessionClicked,
    ExportLogClicked,
    StartClicked,
    /// Explore every button and link on the first URL.
    ElementSweepClicked,
    CloseBrowserClicked,
    /// Engine progress text for the status bar.
    RunStatus(String),
    /// The engine moved on to a new URL.
    UrlStarted {
        index: usize,
        total: usize,
        url: UrlSpec,
    },
    /// A response observed by the driver, stamped on arrival.
    NetworkEventCaptured { event: NetworkEvent, at: Instant },
    /// The engine is about to capture `keyword_text` and waits for the selection to apply.
    CaptureSelectionRequested { request_id: u64, keyword_text: String },
    RowCaptured(ReportRow),
    UrlFailed { url: String, reason: String },
    RunFinished(RunOutcome),
    SweepFinished { summary: String },
    /// Timer tick driving the debounced recompute.
    Tick { now: Instant },
    /// Fallback for placeholder wiring.
    NoOp,
}
