#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use tagqa_core::{KeywordStatus, NetworkEvent};
use tagqa_engine::{
    BrowserDriver, BrowserMode, ClickOptions, DriverError, InteractiveElement, ResponseSink,
    RunEvent, RunHost, SessionId, TabId, TabInfo,
};

pub fn response(name: &str, status: Option<u16>) -> NetworkEvent {
    NetworkEvent {
        resource_name: name.to_string(),
        status_code: status,
        method: "GET".to_string(),
        resource_type: "image".to_string(),
        size_bytes: Some(128),
        captured_at: Utc::now(),
        context_hash: "deadbeef".to_string(),
    }
}

pub fn button(index: usize, id: &str) -> InteractiveElement {
    InteractiveElement {
        index,
        tag: "button".to_string(),
        element_id: Some(id.to_string()),
        text: id.to_string(),
        href: None,
        target: None,
        visible: true,
        enabled: true,
    }
}

pub fn link(index: usize, href: &str, target: Option<&str>) -> InteractiveElement {
    InteractiveElement {
        index,
        tag: "a".to_string(),
        element_id: None,
        text: href.to_string(),
        href: Some(href.to_string()),
        target: target.map(str::to_string),
        visible: true,
        enabled: true,
    }
}

/// What navigating to one URL does.
#[derive(Clone, Default)]
pub struct ScriptedPage {
    pub responses: Vec<NetworkEvent>,
    /// Responses delivered when the element with this id is clicked.
    pub on_click: HashMap<String, Vec<NetworkEvent>>,
    pub elements: Vec<InteractiveElement>,
    pub fail_navigation: Option<String>,
}

struct ScriptedSession {
    sink: Option<Arc<dyn ResponseSink>>,
    page: Option<String>,
    tabs: Vec<TabInfo>,
    next_tab: u64,
}

#[derive(Default)]
struct Inner {
    pages: HashMap<String, ScriptedPage>,
    sessions: HashMap<SessionId, ScriptedSession>,
    next_session: u64,
    calls: Vec<String>,
    screenshots_fail: bool,
}

/// In-memory browser that replays canned pages and records every call.
#[derive(Default)]
pub struct ScriptedDriver {
    inner: Mutex<Inner>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, page: ScriptedPage) -> Self {
        self.inner.lock().unwrap().pages.insert(url.to_string(), page);
        self
    }

    pub fn failing_screenshots(self) -> Self {
        self.inner.lock().unwrap().screenshots_fail = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    fn record(&self, call: String) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn deliver(&self, session: SessionId, events: Vec<NetworkEvent>) {
        let sink = self
            .inner
            .lock()
            .unwrap()
            .sessions
            .get(&session)
            .and_then(|s| s.sink.clone());
        if let Some(sink) = sink {
            for event in events {
                sink.on_response(event);
            }
        }
    }
}

#[async_trait::async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn launch_isolated_session(&self, _mode: BrowserMode) -> Result<SessionId, DriverError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_session += 1;
        let id = SessionId(inner.next_session);
        inner.sessions.insert(
            id,
            ScriptedSession {
                sink: None,
                page: None,
                tabs: vec![TabInfo {
                    id: TabId(0),
                    url: "about:blank".to_string(),
                }],
                next_tab: 1,
            },
        );
        inner.calls.push("launch".to_string());
        Ok(id)
    }

    async fn on_response(
        &self,
        session: SessionId,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<(), DriverError> {
        let mut inner = self.inner.lock().unwrap();
        let s = inner
            .sessions
            .get_mut(&session)
            .ok_or(DriverError::UnknownSession(session))?;
        s.sink = Some(sink);
        Ok(())
    }

    async fn navigate(&self, session: SessionId, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {url}"));
        let page = self.inner.lock().unwrap().pages.get(url).cloned().unwrap_or_default();
        if let Some(message) = page.fail_navigation {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message,
            });
        }
        {
            let mut inner = self.inner.lock().unwrap();
            let s = inner
                .sessions
                .get_mut(&session)
                .ok_or(DriverError::UnknownSession(session))?;
            s.page = Some(url.to_string());
            s.tabs[0].url = url.to_string();
        }
        self.deliver(session, page.responses);
        Ok(())
    }

    async fn screenshot(&self, _session: SessionId) -> Result<Vec<u8>, DriverError> {
        self.record("screenshot".to_string());
        if self.inner.lock().unwrap().screenshots_fail {
            return Err(DriverError::Unsupported("no screen".to_string()));
        }
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn enumerate_interactive_elements(
        &self,
        session: SessionId,
    ) -> Result<Vec<InteractiveElement>, DriverError> {
        let inner = self.inner.lock().unwrap();
        let url = inner
            .sessions
            .get(&session)
            .and_then(|s| s.page.clone())
            .unwrap_or_default();
        Ok(inner
            .pages
            .get(&url)
            .map(|page| page.elements.clone())
            .unwrap_or_default())
    }

    async fn click_by_id(&self, session: SessionId, id: &str) -> Result<(), DriverError> {
        self.record(format!("click_by_id {id}"));
        let events = {
            let inner = self.inner.lock().unwrap();
            let url = inner
                .sessions
                .get(&session)
                .and_then(|s| s.page.clone())
                .unwrap_or_default();
            inner
                .pages
                .get(&url)
                .and_then(|page| page.on_click.get(id).cloned())
                .ok_or_else(|| DriverError::ElementNotFound(id.to_string()))?
        };
        self.deliver(session, events);
        Ok(())
    }

    async fn click_element(
        &self,
        session: SessionId,
        element: &InteractiveElement,
        options: ClickOptions,
    ) -> Result<(), DriverError> {
        self.record(format!("click {}", element.index));
        if element.text == "broken" {
            return Err(DriverError::ElementNotActionable(element.text.clone()));
        }
        if element.is_navigation_link() && (element.opens_new_tab() || options.new_tab_modifier) {
            let mut inner = self.inner.lock().unwrap();
            let s = inner
                .sessions
                .get_mut(&session)
                .ok_or(DriverError::UnknownSession(session))?;
            let id = TabId(s.next_tab);
            s.next_tab += 1;
            s.tabs.push(TabInfo {
                id,
                url: element.href.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn list_open_tabs(&self, session: SessionId) -> Result<Vec<TabInfo>, DriverError> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .get(&session)
            .map(|s| s.tabs.clone())
            .ok_or(DriverError::UnknownSession(session))
    }

    async fn close_tab(&self, session: SessionId, tab: TabId) -> Result<(), DriverError> {
        self.record(format!("close_tab {}", tab.0));
        let mut inner = self.inner.lock().unwrap();
        if let Some(s) = inner.sessions.get_mut(&session) {
            s.tabs.retain(|t| t.id != tab);
        }
        Ok(())
    }

    async fn close_session(&self, session: SessionId) -> Result<(), DriverError> {
        self.record("close_session".to_string());
        let mut inner = self.inner.lock().unwrap();
        inner
            .sessions
            .remove(&session)
            .map(|_| ())
            .ok_or(DriverError::UnknownSession(session))
    }
}

/// Host that records everything and answers selections with a fixed status.
pub struct RecordingHost {
    events: Mutex<Vec<RunEvent>>,
    selections: Mutex<Vec<String>>,
    reply: KeywordStatus,
    cancel_on_select: Option<CancellationToken>,
}

impl RecordingHost {
    pub fn new(reply: KeywordStatus) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            selections: Mutex::new(Vec::new()),
            reply,
            cancel_on_select: None,
        }
    }

    /// Cancels `token` the first time a keyword is selected.
    pub fn cancelling(reply: KeywordStatus, token: CancellationToken) -> Self {
        Self {
            cancel_on_select: Some(token),
            ..Self::new(reply)
        }
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn selections(&self) -> Vec<String> {
        self.selections.lock().unwrap().clone()
    }

    pub fn responses(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RunEvent::Response(_)))
            .count()
    }
}

#[async_trait::async_trait]
impl RunHost for RecordingHost {
    fn emit(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }

    async fn select_keyword(&self, keyword_text: &str) -> KeywordStatus {
        self.selections.lock().unwrap().push(keyword_text.to_string());
        if let Some(token) = &self.cancel_on_select {
            token.cancel();
        }
        self.reply
    }
}
