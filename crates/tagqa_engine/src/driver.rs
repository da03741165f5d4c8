use std::sync::Arc;

use tagqa_core::NetworkEvent;

use crate::{BrowserMode, ClickOptions, DriverError, InteractiveElement, SessionId, TabId, TabInfo};

/// Receives every response a session observes, in arrival order.
pub trait ResponseSink: Send + Sync {
    fn on_response(&self, event: NetworkEvent);
}

/// Capabilities the run loop needs from a browser.
///
/// Every call may fail with a driver-specific [`DriverError`]. Callers treat
/// failures as non-fatal unless they happen during launch or navigation.
#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Opens a fresh session with its own throwaway profile.
    async fn launch_isolated_session(&self, mode: BrowserMode) -> Result<SessionId, DriverError>;

    /// Registers the sink that receives this session's responses. Replaces any earlier sink.
    async fn on_response(
        &self,
        session: SessionId,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<(), DriverError>;

    async fn navigate(&self, session: SessionId, url: &str) -> Result<(), DriverError>;

    /// PNG bytes of the active tab.
    async fn screenshot(&self, session: SessionId) -> Result<Vec<u8>, DriverError>;

    /// Buttons and `a[href]` elements of the active tab, in document order.
    async fn enumerate_interactive_elements(
        &self,
        session: SessionId,
    ) -> Result<Vec<InteractiveElement>, DriverError>;

    /// Clicks the first element carrying `id`, if it is visible and enabled.
    async fn click_by_id(&self, session: SessionId, id: &str) -> Result<(), DriverError>;

    async fn click_element(
        &self,
        session: SessionId,
        element: &InteractiveElement,
        options: ClickOptions,
    ) -> Result<(), DriverError>;

    async fn list_open_tabs(&self, session: SessionId) -> Result<Vec<TabInfo>, DriverError>;

    async fn close_tab(&self, session: SessionId, tab: TabId) -> Result<(), DriverError>;

    /// Closes the session and releases its profile.
    async fn close_session(&self, session: SessionId) -> Result<(), DriverError>;
}
