use crate::{KeywordSpec, KeywordStatus, NetworkEvent, ReportRow, UrlSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartRun {
        urls: Vec<UrlSpec>,
        keywords: Vec<KeywordSpec>,
    },
    StartElementSweep { url: UrlSpec },
    CloseBrowser,
    /// Unblocks the engine's capture step with the status the foreground now shows.
    ResolveCaptureSelection {
        request_id: u64,
        status: KeywordStatus,
    },
    /// Rows already in report order.
    RenderReport { rows: Vec<ReportRow> },
    ExportLog { events: Vec<NetworkEvent> },
    SaveSession {
        urls: Vec<UrlSpec>,
        keywords: Vec<KeywordSpec>,
    },
    Notify { severity: Severity, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Effect {
    pub(crate) fn warn(message: impl Into<String>) -> Self {
        Effect::Notify {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub(crate) fn info(message: impl Into<String>) -> Self {
        Effect::Notify {
            severity: Severity::Info,
            message: message.into(),
        }
    }
}
