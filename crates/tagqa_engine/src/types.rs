use std::fmt;

use thiserror::Error;
use tokio::sync::oneshot;

use tagqa_core::{KeywordStatus, NetworkEvent, ReportRow, UrlSpec};

/// Handle to one isolated browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserMode {
    #[default]
    Incognito,
    Normal,
}

impl BrowserMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "incognito" => Some(BrowserMode::Incognito),
            "normal" => Some(BrowserMode::Normal),
            _ => None,
        }
    }
}

/// Which [`BrowserDriver`](crate::BrowserDriver) the engine starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverBackend {
    /// Fetches pages and their subresources without rendering them.
    #[default]
    Http,
    /// Drives Chrome over the DevTools protocol. Needs the `browser` feature.
    Chrome,
}

impl DriverBackend {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" => Some(DriverBackend::Http),
            "chrome" | "chromium" => Some(DriverBackend::Chrome),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

/// A button or link found on the active tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveElement {
    /// Position in document order, stable for one page load.
    pub index: usize,
    pub tag: String,
    pub element_id: Option<String>,
    pub text: String,
    pub href: Option<String>,
    pub target: Option<String>,
    pub visible: bool,
    pub enabled: bool,
}

impl InteractiveElement {
    /// True for links that leave the page; fragments and `javascript:` do not.
    pub fn is_navigation_link(&self) -> bool {
        self.href
            .as_deref()
            .is_some_and(|href| !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:"))
    }

    pub fn opens_new_tab(&self) -> bool {
        self.target.as_deref() == Some("_blank")
    }

    pub fn is_actionable(&self) -> bool {
        self.visible && self.enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOptions {
    pub timeout: std::time::Duration,
    /// Hold the platform's open-in-new-tab modifier while clicking.
    pub new_tab_modifier: bool,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            timeout: std::time::Duration::from_secs(5),
            new_tab_modifier: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("unknown {0}")]
    UnknownSession(SessionId),
    #[error("{0} was closed")]
    SessionClosed(SessionId),
    #[error("no element with id '{0}'")]
    ElementNotFound(String),
    #[error("element '{0}' is hidden or disabled")]
    ElementNotActionable(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("not supported by this driver: {0}")]
    Unsupported(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("there are no URLs to test")]
    NothingToRun,
    #[error("the browser was closed")]
    BrowserClosed,
    #[error("engine failure: {0}")]
    Engine(String),
}

/// Progress reported by a running test or sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Status(String),
    UrlStarted {
        index: usize,
        total: usize,
        url: UrlSpec,
    },
    Response(NetworkEvent),
    RowCaptured(ReportRow),
    UrlFailed { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlResult {
    Completed { rows: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOutcome {
    pub url: String,
    pub result: UrlResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub urls: Vec<UrlOutcome>,
    pub rows_captured: usize,
}

impl RunSummary {
    pub fn failed(&self) -> Vec<(String, String)> {
        self.urls
            .iter()
            .filter_map(|outcome| match &outcome.result {
                UrlResult::Failed { reason } => Some((outcome.url.clone(), reason.clone())),
                UrlResult::Completed { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepSummary {
    pub url: String,
    pub elements_found: usize,
    pub clicked: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Element test on {}: {} clicked, {} skipped, {} failed of {} found",
            self.url, self.clicked, self.skipped, self.failed, self.elements_found
        )
    }
}

#[derive(Debug)]
pub enum EngineEvent {
    Run(RunEvent),
    /// The run waits on `reply` until the foreground shows `keyword_text` as selected.
    SelectionRequested {
        keyword_text: String,
        reply: oneshot::Sender<KeywordStatus>,
    },
    RunFinished(Result<RunSummary, RunError>),
    SweepFinished(Result<SweepSummary, RunError>),
}
