//! Chrome driven over the DevTools protocol.
//!
//! Each session launches its own Chrome process on a throwaway profile.
//! Responses come from the protocol's network events, so requests fired by
//! page scripts (tag beacons, XHR) are reported along with the page's own loads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, EventResponseReceived, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use chrono::Utc;
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use tagqa_core::NetworkEvent;

use crate::driver::{BrowserDriver, ResponseSink};
use crate::http_driver::DriverSettings;
use crate::naming::short_hash;
use crate::{
    BrowserMode, ClickOptions, DriverError, InteractiveElement, SessionId, TabId, TabInfo,
};

const INTERACTIVE_SELECTOR: &str = "button, a[href]";

/// Ctrl opens links in a new tab, Cmd on macOS.
const NEW_TAB_MODIFIER: i64 = if cfg!(target_os = "macos") { 4 } else { 2 };

const SCAN_ELEMENTS: &str = r#"Array.from(document.querySelectorAll('button, a[href]')).map((el) => {
  const box = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  return {
    tag: el.tagName.toLowerCase(),
    id: el.id || null,
    text: el.innerText || el.textContent || '',
    href: el.getAttribute('href'),
    target: el.getAttribute('target'),
    visible: box.width > 0 && box.height > 0 && style.visibility !== 'hidden' && style.display !== 'none',
    enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
  };
})"#;

/// Browser driver backed by a real Chrome.
pub struct ChromeDriver {
    settings: DriverSettings,
    sessions: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<ChromeSession>>>>,
    next_session: AtomicU64,
}

struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    observer: Arc<Mutex<Observer>>,
    tabs: Vec<Tab>,
    next_tab: u64,
    closed: bool,
    // Removed from disk when the session is dropped.
    _profile: TempDir,
}

struct Tab {
    id: TabId,
    page: Page,
    listener: JoinHandle<()>,
}

/// Shared between a session and the listener tasks of its tabs.
#[derive(Default)]
struct Observer {
    sink: Option<Arc<dyn ResponseSink>>,
    context_hash: String,
    methods: HashMap<RequestId, String>,
}

enum Traffic {
    Request(Arc<EventRequestWillBeSent>),
    Response(Arc<EventResponseReceived>),
}

#[derive(Debug, Deserialize)]
struct ElementRecord {
    tag: String,
    id: Option<String>,
    text: String,
    href: Option<String>,
    target: Option<String>,
    visible: bool,
    enabled: bool,
}

impl ElementRecord {
    fn into_element(self, index: usize) -> InteractiveElement {
        InteractiveElement {
            index,
            tag: self.tag,
            element_id: self.id.filter(|id| !id.is_empty()),
            text: self.text.split_whitespace().collect::<Vec<_>>().join(" "),
            href: self.href,
            target: self.target,
            visible: self.visible,
            enabled: self.enabled,
        }
    }
}

fn lock(observer: &Mutex<Observer>) -> MutexGuard<'_, Observer> {
    observer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn protocol_error(err: impl std::fmt::Display) -> DriverError {
    DriverError::Protocol(err.to_string())
}

impl ChromeDriver {
    pub fn new(settings: DriverSettings) -> Self {
        Self {
            settings,
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        }
    }

    fn session(
        &self,
        id: SessionId,
    ) -> Result<Arc<tokio::sync::Mutex<ChromeSession>>, DriverError> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(DriverError::UnknownSession(id))
    }

    async fn main_page(&self, id: SessionId) -> Result<Page, DriverError> {
        let session = self.session(id)?;
        let session = session.lock().await;
        session.main_page(id)
    }

    fn browser_config(
        &self,
        mode: BrowserMode,
        profile: &TempDir,
    ) -> Result<BrowserConfig, DriverError> {
        let (width, height) = self.settings.window_size;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(width, height)
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run");
        if self.settings.headed {
            builder = builder.with_head();
        }
        if mode == BrowserMode::Incognito {
            builder = builder.arg("--incognito");
        }
        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(DriverError::Launch)
    }

    async fn perform_click(
        &self,
        id: SessionId,
        element: &InteractiveElement,
        new_tab_modifier: bool,
    ) -> Result<(), DriverError> {
        let page = self.main_page(id).await?;
        let handles = page
            .find_elements(INTERACTIVE_SELECTOR)
            .await
            .map_err(protocol_error)?;
        let handle = handles.get(element.index).ok_or_else(|| {
            DriverError::ElementNotFound(
                element
                    .element_id
                    .clone()
                    .unwrap_or_else(|| element.text.clone()),
            )
        })?;
        if !new_tab_modifier {
            handle.click().await.map_err(protocol_error)?;
            return Ok(());
        }

        handle.scroll_into_view().await.map_err(protocol_error)?;
        let point = handle.clickable_point().await.map_err(protocol_error)?;
        for kind in [
            DispatchMouseEventType::MousePressed,
            DispatchMouseEventType::MouseReleased,
        ] {
            let params = DispatchMouseEventParams::builder()
                .r#type(kind)
                .x(point.x)
                .y(point.y)
                .button(MouseButton::Left)
                .click_count(1)
                .modifiers(NEW_TAB_MODIFIER)
                .build()
                .map_err(DriverError::Protocol)?;
            page.execute(params).await.map_err(protocol_error)?;
        }
        Ok(())
    }
}

impl Default for ChromeDriver {
    fn default() -> Self {
        Self::new(DriverSettings::default())
    }
}

impl ChromeSession {
    fn main_page(&self, id: SessionId) -> Result<Page, DriverError> {
        if self.closed {
            return Err(DriverError::SessionClosed(id));
        }
        self.tabs
            .first()
            .map(|tab| tab.page.clone())
            .ok_or(DriverError::SessionClosed(id))
    }

    async fn adopt(&mut self, page: Page) -> Result<TabId, DriverError> {
        let listener = observe(&page, self.observer.clone()).await?;
        let id = TabId(self.next_tab);
        self.next_tab += 1;
        self.tabs.push(Tab { id, page, listener });
        Ok(id)
    }

    /// Picks up tabs the page opened and forgets the ones it closed.
    async fn sync_tabs(&mut self) -> Result<(), DriverError> {
        let pages = self.browser.pages().await.map_err(protocol_error)?;
        self.tabs.retain(|tab| {
            let alive = pages.iter().any(|p| p.target_id() == tab.page.target_id());
            if !alive {
                tab.listener.abort();
            }
            alive
        });
        for page in pages {
            if !self.tabs.iter().any(|tab| tab.page.target_id() == page.target_id()) {
                self.adopt(page).await?;
            }
        }
        Ok(())
    }
}

/// Forwards a tab's responses to the session's sink.
async fn observe(
    page: &Page,
    observer: Arc<Mutex<Observer>>,
) -> Result<JoinHandle<()>, DriverError> {
    let requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(protocol_error)?;
    let responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(protocol_error)?;
    let mut traffic = Box::pin(futures_util::stream::select(
        requests.map(Traffic::Request),
        responses.map(Traffic::Response),
    ));

    Ok(tokio::spawn(async move {
        while let Some(item) = traffic.next().await {
            match item {
                Traffic::Request(sent) => {
                    lock(&observer)
                        .methods
                        .insert(sent.request_id.clone(), sent.request.method.clone());
                }
                Traffic::Response(received) => {
                    if !is_observable(&received.response.url) {
                        continue;
                    }
                    let (sink, event) = {
                        let mut state = lock(&observer);
                        let method = state
                            .methods
                            .remove(&received.request_id)
                            .unwrap_or_else(|| "GET".to_string());
                        let event = NetworkEvent {
                            resource_name: NetworkEvent::resource_name_for(&received.response.url),
                            status_code: u16::try_from(received.response.status).ok(),
                            method,
                            resource_type: received.r#type.as_ref().to_ascii_lowercase(),
                            size_bytes: content_length(received.response.headers.inner()),
                            captured_at: Utc::now(),
                            context_hash: state.context_hash.clone(),
                        };
                        (state.sink.clone(), event)
                    };
                    if let Some(sink) = sink {
                        sink.on_response(event);
                    }
                }
            }
        }
    }))
}

/// Inline payloads never touch the network.
fn is_observable(url: &str) -> bool {
    !(url.starts_with("data:") || url.starts_with("blob:"))
}

fn content_length(headers: &serde_json::Value) -> Option<u64> {
    headers
        .as_object()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| match value {
            serde_json::Value::String(text) => text.trim().parse().ok(),
            serde_json::Value::Number(number) => number.as_u64(),
            _ => None,
        })
}

#[async_trait::async_trait]
impl BrowserDriver for ChromeDriver {
    async fn launch_isolated_session(&self, mode: BrowserMode) -> Result<SessionId, DriverError> {
        let profile = tempfile::Builder::new()
            .prefix("tagqa-chrome-")
            .tempdir()
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        let config = self.browser_config(mode, &profile)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    engine_debug!("DevTools handler: {}", err);
                }
            }
        });

        let main = browser
            .new_page("about:blank")
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        // The startup tab is not ours to track.
        if let Ok(pages) = browser.pages().await {
            for page in pages {
                if page.target_id() != main.target_id() {
                    let _ = page.close().await;
                }
            }
        }

        let mut session = ChromeSession {
            browser,
            handler,
            observer: Arc::new(Mutex::new(Observer::default())),
            tabs: Vec::new(),
            next_tab: 0,
            closed: false,
            _profile: profile,
        };
        session.adopt(main).await?;

        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        engine_info!("Launched Chrome {} ({:?})", id, mode);
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(tokio::sync::Mutex::new(session)));
        Ok(id)
    }

    async fn on_response(
        &self,
        session: SessionId,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<(), DriverError> {
        let session = self.session(session)?;
        let session = session.lock().await;
        lock(&session.observer).sink = Some(sink);
        Ok(())
    }

    async fn navigate(&self, session: SessionId, url: &str) -> Result<(), DriverError> {
        let page = {
            let handle = self.session(session)?;
            let state = handle.lock().await;
            lock(&state.observer).context_hash = short_hash(url);
            state.main_page(session)?
        };
        page.goto(url)
            .await
            .map_err(|err| DriverError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        engine_debug!("{} loaded {}", session, url);
        Ok(())
    }

    async fn screenshot(&self, session: SessionId) -> Result<Vec<u8>, DriverError> {
        let page = self.main_page(session).await?;
        page.screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build(),
        )
        .await
        .map_err(protocol_error)
    }

    async fn enumerate_interactive_elements(
        &self,
        session: SessionId,
    ) -> Result<Vec<InteractiveElement>, DriverError> {
        let page = self.main_page(session).await?;
        let records: Vec<ElementRecord> = page
            .evaluate(SCAN_ELEMENTS)
            .await
            .map_err(protocol_error)?
            .into_value()
            .map_err(protocol_error)?;
        Ok(records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_element(index))
            .collect())
    }

    async fn click_by_id(&self, session: SessionId, id: &str) -> Result<(), DriverError> {
        let page = self.main_page(session).await?;
        let quoted = serde_json::to_string(id).map_err(protocol_error)?;
        let state: String = page
            .evaluate(format!(
                "(() => {{ const el = document.getElementById({quoted}); if (!el) return 'missing'; \
                 const box = el.getBoundingClientRect(); const style = window.getComputedStyle(el); \
                 const visible = box.width > 0 && box.height > 0 && style.visibility !== 'hidden'; \
                 return visible && !el.disabled ? 'ready' : 'blocked'; }})()"
            ))
            .await
            .map_err(protocol_error)?
            .into_value()
            .map_err(protocol_error)?;
        match state.as_str() {
            "ready" => {}
            "missing" => return Err(DriverError::ElementNotFound(id.to_string())),
            _ => return Err(DriverError::ElementNotActionable(id.to_string())),
        }

        let timeout = ClickOptions::default().timeout;
        let click = async {
            page.find_element(format!("[id={quoted}]"))
                .await
                .map_err(|_| DriverError::ElementNotFound(id.to_string()))?
                .click()
                .await
                .map_err(protocol_error)?;
            Ok::<(), DriverError>(())
        };
        tokio::time::timeout(timeout, click)
            .await
            .map_err(|_| DriverError::Timeout(timeout))?
    }

    async fn click_element(
        &self,
        session: SessionId,
        element: &InteractiveElement,
        options: ClickOptions,
    ) -> Result<(), DriverError> {
        tokio::time::timeout(
            options.timeout,
            self.perform_click(session, element, options.new_tab_modifier),
        )
        .await
        .map_err(|_| DriverError::Timeout(options.timeout))?
    }

    async fn list_open_tabs(&self, session: SessionId) -> Result<Vec<TabInfo>, DriverError> {
        let handle = self.session(session)?;
        let mut state = handle.lock().await;
        if state.closed {
            return Err(DriverError::SessionClosed(session));
        }
        state.sync_tabs().await?;
        let mut tabs = Vec::with_capacity(state.tabs.len());
        for tab in &state.tabs {
            let url = tab.page.url().await.ok().flatten().unwrap_or_default();
            tabs.push(TabInfo { id: tab.id, url });
        }
        Ok(tabs)
    }

    async fn close_tab(&self, session: SessionId, tab: TabId) -> Result<(), DriverError> {
        let handle = self.session(session)?;
        let mut state = handle.lock().await;
        if state.closed {
            return Err(DriverError::SessionClosed(session));
        }
        let Some(position) = state.tabs.iter().position(|t| t.id == tab) else {
            return Ok(());
        };
        if position == 0 {
            engine_info!("{}: main tab closed, session ends", session);
            state.closed = true;
        }
        let closing = state.tabs.remove(position);
        closing.listener.abort();
        if let Err(err) = closing.page.close().await {
            engine_warn!("{}: closing tab failed: {}", session, err);
        }
        Ok(())
    }

    async fn close_session(&self, session: SessionId) -> Result<(), DriverError> {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session)
            .ok_or(DriverError::UnknownSession(session))?;
        let mut state = removed.lock().await;
        for tab in state.tabs.drain(..) {
            tab.listener.abort();
        }
        if let Err(err) = state.browser.close().await {
            engine_warn!("{}: Chrome did not close cleanly: {}", session, err);
        }
        let _ = state.browser.wait().await;
        state.handler.abort();
        engine_info!("Closed {}", session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_length_header_is_case_insensitive() {
        assert_eq!(content_length(&json!({"Content-Length": " 512 "})), Some(512));
        assert_eq!(content_length(&json!({"content-length": 64})), Some(64));
        assert_eq!(content_length(&json!({"content-type": "text/html"})), None);
        assert_eq!(content_length(&json!("not headers")), None);
    }

    #[test]
    fn scanned_records_become_elements() {
        let records: Vec<ElementRecord> = serde_json::from_value(json!([
            {"tag": "button", "id": "", "text": "  Open\n menu ", "href": null,
             "target": null, "visible": true, "enabled": false},
            {"tag": "a", "id": "promo", "text": "Shop", "href": "/shop",
             "target": "_blank", "visible": true, "enabled": true}
        ]))
        .unwrap();
        let elements: Vec<_> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_element(index))
            .collect();

        assert_eq!(elements[0].element_id, None);
        assert_eq!(elements[0].text, "Open menu");
        assert!(!elements[0].is_actionable());
        assert_eq!(elements[1].index, 1);
        assert!(elements[1].opens_new_tab());
        assert!(elements[1].is_navigation_link());
    }

    #[test]
    fn inline_payloads_are_not_reported() {
        assert!(!is_observable("data:image/png;base64,AAAA"));
        assert!(!is_observable("blob:https://example.com/1"));
        assert!(is_observable("https://example.com/a_keyword_1.png"));
    }
}
