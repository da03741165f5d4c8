//! "Click everything" exploratory test, independent of the keyword run.

use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use tagqa_core::UrlSpec;

use crate::run::{ensure_open, RunController, RunHost, StepError};
use crate::{ClickOptions, DriverError, InteractiveElement, RunError, RunEvent, SessionId, SweepSummary};

impl RunController {
    /// Opens `url` and clicks each visible, enabled button and link once.
    ///
    /// Every item is bounded by the sweep item timeout; failures are logged and
    /// the sweep moves on. Tabs opened along the way are closed again.
    pub async fn sweep_elements(
        &self,
        url: &UrlSpec,
        host: Arc<dyn RunHost>,
        cancel: &CancellationToken,
    ) -> Result<SweepSummary, RunError> {
        host.emit(RunEvent::Status(format!("Launching browser for {}...", url.url)));
        let session = self
            .driver
            .launch_isolated_session(self.settings.mode)
            .await
            .map_err(|err| RunError::Engine(err.to_string()))?;
        let result = self.sweep_session(session, url, &host, cancel).await;
        if let Err(err) = self.driver.close_session(session).await {
            engine_warn!("Failed to close {}: {}", session, err);
        }
        match result {
            Ok(summary) => {
                engine_info!("{}", summary);
                Ok(summary)
            }
            Err(StepError::Failed(reason)) => Err(RunError::Engine(reason)),
            Err(StepError::Aborted(err)) => Err(err),
        }
    }

    async fn sweep_session(
        &self,
        session: SessionId,
        url: &UrlSpec,
        host: &Arc<dyn RunHost>,
        cancel: &CancellationToken,
    ) -> Result<SweepSummary, StepError> {
        self.open_page(session, url, host, cancel).await?;
        let start_url = self
            .driver
            .list_open_tabs(session)
            .await?
            .first()
            .map(|tab| tab.url.clone())
            .unwrap_or_else(|| url.url.clone());
        let elements = self.driver.enumerate_interactive_elements(session).await?;

        let mut summary = SweepSummary {
            url: url.url.clone(),
            elements_found: elements.len(),
            ..SweepSummary::default()
        };
        let item_timeout = self.settings.sweep_item_timeout;
        for (i, element) in elements.iter().enumerate() {
            ensure_open(cancel)?;
            if !element.is_actionable() {
                summary.skipped += 1;
                continue;
            }
            host.emit(RunEvent::Status(format!(
                "Testing element {}/{}: <{}> '{}'",
                i + 1,
                elements.len(),
                element.tag,
                element.text
            )));
            let attempt = self.exercise(session, element, &start_url, cancel);
            match tokio::time::timeout(item_timeout, attempt).await {
                Ok(Ok(())) => summary.clicked += 1,
                Ok(Err(StepError::Aborted(err))) => return Err(StepError::Aborted(err)),
                Ok(Err(StepError::Failed(reason))) => {
                    engine_warn!("Error clicking element {}: {}", i + 1, reason);
                    summary.failed += 1;
                }
                Err(_) => {
                    engine_warn!("Element {} timed out after {:?}", i + 1, item_timeout);
                    summary.failed += 1;
                }
            }
        }

        self.close_extra_tabs(session, &start_url).await?;
        host.emit(RunEvent::Status(summary.to_string()));
        Ok(summary)
    }

    async fn exercise(
        &self,
        session: SessionId,
        element: &InteractiveElement,
        start_url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), StepError> {
        if element.is_navigation_link() {
            // Same-tab links are opened in a new tab so the page under test survives.
            let options = ClickOptions {
                timeout: self.settings.click_timeout,
                new_tab_modifier: !element.opens_new_tab(),
            };
            self.driver.click_element(session, element, options).await?;
            self.pause(self.settings.link_wait, cancel).await?;
            self.close_extra_tabs(session, start_url).await?;
            self.pause(self.settings.tab_close_wait, cancel).await?;
        } else {
            let options = ClickOptions {
                timeout: self.settings.click_timeout,
                new_tab_modifier: false,
            };
            self.driver.click_element(session, element, options).await?;
            self.pause(self.settings.button_wait, cancel).await?;
        }
        Ok(())
    }

    async fn close_extra_tabs(&self, session: SessionId, start_url: &str) -> Result<(), StepError> {
        let tabs = match self.driver.list_open_tabs(session).await {
            Ok(tabs) => tabs,
            Err(DriverError::SessionClosed(_)) => {
                return Err(StepError::Aborted(RunError::BrowserClosed))
            }
            Err(err) => {
                engine_warn!("Could not list tabs: {}", err);
                return Ok(());
            }
        };
        for tab in tabs.into_iter().filter(|tab| tab.url != start_url) {
            engine_debug!("Closing tab {}", tab.url);
            if let Err(err) = self.driver.close_tab(session, tab.id).await {
                engine_warn!("Failed to close tab {}: {}", tab.url, err);
            }
        }
        Ok(())
    }
}
