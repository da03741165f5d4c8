use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use engine_logging::{engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use tagqa_core::{relevant_keywords, KeywordSpec, KeywordStatus, NetworkEvent, ReportRow, UrlSpec};

use crate::driver::{BrowserDriver, ResponseSink};
use crate::naming::capture_filename;
use crate::persist::ArtifactWriter;
use crate::{BrowserMode, DriverError, RunError, RunEvent, RunSummary, SessionId, UrlOutcome, UrlResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub mode: BrowserMode,
    /// Network idle is declared when no response arrives for one interval.
    pub idle_interval: Duration,
    /// Give up waiting for idle after this long and carry on. `None` waits forever.
    pub idle_cap: Option<Duration>,
    pub url_settle: Duration,
    pub selection_settle: Duration,
    pub click_timeout: Duration,
    pub link_wait: Duration,
    pub button_wait: Duration,
    pub tab_close_wait: Duration,
    pub sweep_item_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            mode: BrowserMode::Incognito,
            idle_interval: Duration::from_secs(3),
            idle_cap: Some(Duration::from_secs(120)),
            url_settle: Duration::from_millis(500),
            selection_settle: Duration::from_millis(500),
            click_timeout: Duration::from_secs(5),
            link_wait: Duration::from_millis(2990),
            button_wait: Duration::from_secs(3),
            tab_close_wait: Duration::from_millis(10),
            sweep_item_timeout: Duration::from_secs(15),
        }
    }
}

/// The foreground side of a run.
#[async_trait::async_trait]
pub trait RunHost: Send + Sync {
    fn emit(&self, event: RunEvent);

    /// Asks the foreground to select `keyword_text` with an up-to-date match
    /// index, and resolves once it has. Returns the status it then shows.
    async fn select_keyword(&self, keyword_text: &str) -> KeywordStatus;
}

/// Forwards responses to the host and counts them for idle detection.
pub struct ResponseRecorder {
    host: Arc<dyn RunHost>,
    seen: AtomicUsize,
}

impl ResponseRecorder {
    pub fn new(host: Arc<dyn RunHost>) -> Self {
        Self {
            host,
            seen: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

impl ResponseSink for ResponseRecorder {
    fn on_response(&self, event: NetworkEvent) {
        self.seen.fetch_add(1, Ordering::SeqCst);
        self.host.emit(RunEvent::Response(event));
    }
}

/// Why a step stopped: the URL failed, or the whole run must end.
#[derive(Debug)]
pub(crate) enum StepError {
    Failed(String),
    Aborted(RunError),
}

impl From<DriverError> for StepError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::SessionClosed(_) => StepError::Aborted(RunError::BrowserClosed),
            other => StepError::Failed(other.to_string()),
        }
    }
}

impl From<RunError> for StepError {
    fn from(err: RunError) -> Self {
        StepError::Aborted(err)
    }
}

/// Sweeps URLs one at a time, capturing every relevant keyword on each.
pub struct RunController {
    pub(crate) driver: Arc<dyn BrowserDriver>,
    pub(crate) settings: RunSettings,
    captures: ArtifactWriter,
}

impl RunController {
    pub fn new(driver: Arc<dyn BrowserDriver>, settings: RunSettings, captures_dir: PathBuf) -> Self {
        Self {
            driver,
            settings,
            captures: ArtifactWriter::new(captures_dir),
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Runs every URL in order. Only a closed browser ends the run early.
    pub async fn run(
        &self,
        urls: &[UrlSpec],
        keywords: &[KeywordSpec],
        host: Arc<dyn RunHost>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        if urls.is_empty() {
            return Err(RunError::NothingToRun);
        }
        let result = self.run_all(urls, keywords, &host, cancel).await;
        engine_logging::clear_run_scope();
        match &result {
            Ok(summary) => engine_info!(
                "Run finished: {} URLs, {} rows, {} failed",
                summary.urls.len(),
                summary.rows_captured,
                summary.failed().len()
            ),
            Err(err) => engine_warn!("Run aborted: {}", err),
        }
        result
    }

    async fn run_all(
        &self,
        urls: &[UrlSpec],
        keywords: &[KeywordSpec],
        host: &Arc<dyn RunHost>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let total = urls.len();
        let mut summary = RunSummary::default();
        for (index, url) in urls.iter().enumerate() {
            ensure_open(cancel)?;
            engine_logging::set_run_scope(format!("url {}/{}", index + 1, total));
            host.emit(RunEvent::UrlStarted {
                index,
                total,
                url: url.clone(),
            });
            self.pause(self.settings.url_settle, cancel).await?;
            host.emit(RunEvent::Status(format!(
                "URL {}/{}: Starting test for {}",
                index + 1,
                total,
                url.url
            )));

            match self.run_url(url, keywords, host, cancel).await {
                Ok(rows) => {
                    summary.rows_captured += rows;
                    summary.urls.push(UrlOutcome {
                        url: url.url.clone(),
                        result: UrlResult::Completed { rows },
                    });
                }
                Err(StepError::Failed(reason)) => {
                    engine_warn!("Skipping {}: {}", url.url, reason);
                    host.emit(RunEvent::UrlFailed {
                        url: url.url.clone(),
                        reason: reason.clone(),
                    });
                    summary.urls.push(UrlOutcome {
                        url: url.url.clone(),
                        result: UrlResult::Failed { reason },
                    });
                }
                Err(StepError::Aborted(err)) => return Err(err),
            }
        }
        Ok(summary)
    }

    async fn run_url(
        &self,
        url: &UrlSpec,
        keywords: &[KeywordSpec],
        host: &Arc<dyn RunHost>,
        cancel: &CancellationToken,
    ) -> Result<usize, StepError> {
        host.emit(RunEvent::Status(format!("Launching browser for {}...", url.url)));
        let session = self
            .driver
            .launch_isolated_session(self.settings.mode)
            .await?;
        let result = self
            .capture_keywords(session, url, keywords, host, cancel)
            .await;
        if let Err(err) = self.driver.close_session(session).await {
            engine_warn!("Failed to close {}: {}", session, err);
        }
        result
    }

    async fn capture_keywords(
        &self,
        session: SessionId,
        url: &UrlSpec,
        keywords: &[KeywordSpec],
        host: &Arc<dyn RunHost>,
        cancel: &CancellationToken,
    ) -> Result<usize, StepError> {
        let recorder = self.open_page(session, url, host, cancel).await?;

        let relevant = relevant_keywords(keywords, url);
        let count = relevant.len();
        let mut activated: HashSet<&str> = HashSet::new();
        let mut rows = 0;
        for (i, keyword) in relevant.into_iter().enumerate() {
            ensure_open(cancel)?;
            host.emit(RunEvent::Status(format!(
                "Processing keyword {}/{}: '{}'...",
                i + 1,
                count,
                keyword.text
            )));

            if let Some(id) = keyword.element_id.as_deref() {
                if activated.insert(id) {
                    self.activate(session, id).await?;
                    self.wait_for_network_idle(&recorder, host.as_ref(), cancel)
                        .await?;
                }
            }

            host.emit(RunEvent::Status(format!(
                "Capturing keyword {}/{}: '{}' for URL lang '{}'...",
                i + 1,
                count,
                keyword.text,
                url.language
            )));
            let status = host.select_keyword(&keyword.text).await;
            self.pause(self.settings.selection_settle, cancel).await?;
            let screenshot_path = self.capture(session, url, keyword, host.as_ref()).await?;

            host.emit(RunEvent::RowCaptured(ReportRow {
                keyword_text: keyword.text.clone(),
                language: keyword.language,
                url: url.url.clone(),
                status,
                screenshot_path,
            }));
            rows += 1;
        }

        host.emit(RunEvent::Status(format!(
            "Finished with {}. Closing browser.",
            url.url
        )));
        Ok(rows)
    }

    /// Attaches a recorder to `session`, loads `url` and waits for the traffic to settle.
    pub(crate) async fn open_page(
        &self,
        session: SessionId,
        url: &UrlSpec,
        host: &Arc<dyn RunHost>,
        cancel: &CancellationToken,
    ) -> Result<Arc<ResponseRecorder>, StepError> {
        let recorder = Arc::new(ResponseRecorder::new(host.clone()));
        self.driver
            .on_response(session, recorder.clone())
            .await?;
        self.driver.navigate(session, &url.url).await?;
        self.wait_for_network_idle(&recorder, host.as_ref(), cancel)
            .await?;
        Ok(recorder)
    }

    /// Polls the response count once per interval until it stops moving.
    pub async fn wait_for_network_idle(
        &self,
        recorder: &ResponseRecorder,
        host: &dyn RunHost,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        host.emit(RunEvent::Status(
            "Waiting for network to become idle...".to_string(),
        ));
        let started = tokio::time::Instant::now();
        loop {
            let before = recorder.count();
            self.pause(self.settings.idle_interval, cancel).await?;
            if recorder.count() == before {
                host.emit(RunEvent::Status("Network is idle. Proceeding...".to_string()));
                return Ok(());
            }
            if let Some(cap) = self.settings.idle_cap {
                if started.elapsed() >= cap {
                    engine_warn!(
                        "Network still busy after {:?} ({} responses); proceeding anyway",
                        cap,
                        recorder.count()
                    );
                    return Ok(());
                }
            }
        }
    }

    // Best effort: only a closed browser is an error.
    async fn activate(&self, session: SessionId, element_id: &str) -> Result<(), StepError> {
        let timeout = self.settings.click_timeout;
        match tokio::time::timeout(timeout, self.driver.click_by_id(session, element_id)).await {
            Ok(Ok(())) => engine_info!("Clicked element '{}'", element_id),
            Ok(Err(DriverError::SessionClosed(_))) => {
                return Err(StepError::Aborted(RunError::BrowserClosed))
            }
            Ok(Err(err)) => engine_warn!("Could not click element '{}': {}", element_id, err),
            Err(_) => engine_warn!(
                "Clicking element '{}' timed out after {:?}",
                element_id,
                timeout
            ),
        }
        Ok(())
    }

    // Returns where the capture belongs even when it could not be written.
    async fn capture(
        &self,
        session: SessionId,
        url: &UrlSpec,
        keyword: &KeywordSpec,
        host: &dyn RunHost,
    ) -> Result<PathBuf, StepError> {
        let filename = capture_filename(url, &keyword.text, &Local::now());
        let path = self.captures.dir().join(&filename);
        match self.driver.screenshot(session).await {
            Ok(png) => match self.captures.store(&filename, &png) {
                Ok(written) => {
                    host.emit(RunEvent::Status(format!("Screenshot saved: {filename}")));
                    return Ok(written);
                }
                Err(err) => engine_warn!("Failed to write {}: {}", path.display(), err),
            },
            Err(DriverError::SessionClosed(_)) => {
                return Err(StepError::Aborted(RunError::BrowserClosed))
            }
            Err(err) => engine_warn!("Capture for '{}' failed: {}", keyword.text, err),
        }
        Ok(path)
    }

    pub(crate) async fn pause(
        &self,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunError::BrowserClosed),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

pub(crate) fn ensure_open(cancel: &CancellationToken) -> Result<(), RunError> {
    if cancel.is_cancelled() {
        Err(RunError::BrowserClosed)
    } else {
        Ok(())
    }
}
