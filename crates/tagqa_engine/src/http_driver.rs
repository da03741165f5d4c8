use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use tempfile::TempDir;

use tagqa_core::NetworkEvent;

use crate::driver::{BrowserDriver, ResponseSink};
use crate::naming::short_hash;
use crate::page::{resolve_href, scan_page, Subresource};
use crate::{
    BrowserMode, ClickOptions, DriverBackend, DriverError, InteractiveElement, SessionId, TabId,
    TabInfo,
};

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Subresource requests in flight at once per page load.
    pub max_concurrent_fetches: usize,
    pub max_subresources: usize,
    pub user_agent: String,
    pub backend: DriverBackend,
    /// Show the Chrome window. Ignored by the HTTP driver.
    pub headed: bool,
    /// Chrome binary to launch instead of the one found on `PATH`.
    pub chrome_executable: Option<PathBuf>,
    pub window_size: (u32, u32),
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 6,
            max_subresources: 500,
            user_agent: concat!("tagqa/", env!("CARGO_PKG_VERSION")).to_string(),
            backend: DriverBackend::default(),
            headed: false,
            chrome_executable: None,
            window_size: (1280, 900),
        }
    }
}

/// Browser driver without a rendering engine.
///
/// Loading a page fetches the document and every subresource it references,
/// reporting one response per request. Links can be followed; buttons cause
/// no traffic. Screenshots are not available.
pub struct HttpDriver {
    settings: DriverSettings,
    sessions: Mutex<HashMap<SessionId, HttpSession>>,
    next_session: AtomicU64,
}

struct HttpSession {
    client: reqwest::Client,
    // Removed from disk when the session is dropped.
    _profile: TempDir,
    sink: Option<Arc<dyn ResponseSink>>,
    context_hash: String,
    tabs: Vec<Tab>,
    next_tab: u64,
    closed: bool,
}

struct Tab {
    id: TabId,
    url: String,
    elements: Vec<InteractiveElement>,
}

struct PageLoad {
    final_url: String,
    elements: Vec<InteractiveElement>,
}

impl HttpDriver {
    pub fn new(settings: DriverSettings) -> Self {
        Self {
            settings,
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, HttpSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_session<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut HttpSession) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(&id)
            .ok_or(DriverError::UnknownSession(id))?;
        if session.closed {
            return Err(DriverError::SessionClosed(id));
        }
        f(session)
    }

    fn main_tab_url(&self, id: SessionId) -> Result<String, DriverError> {
        self.with_session(id, |s| {
            s.tabs
                .first()
                .map(|tab| tab.url.clone())
                .ok_or(DriverError::SessionClosed(id))
        })
    }

    async fn load_page(&self, id: SessionId, url: &str) -> Result<PageLoad, DriverError> {
        let (client, sink, context_hash) = self.with_session(id, |s| {
            Ok((s.client.clone(), s.sink.clone(), s.context_hash.clone()))
        })?;
        let navigation_error = |err: reqwest::Error| DriverError::Navigation {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = client.get(url).send().await.map_err(navigation_error)?;
        let final_url = response.url().to_string();
        let event = response_event(&response, "document", &context_hash);
        engine_debug!("{} {} -> {:?}", id, final_url, event.status_code);
        if let Some(sink) = &sink {
            sink.on_response(event);
        }
        let body = response.text().await.map_err(navigation_error)?;

        let scan = scan_page(&body, &final_url, self.settings.max_subresources);
        self.fetch_subresources(&client, sink.as_deref(), &context_hash, &scan.subresources)
            .await;

        Ok(PageLoad {
            final_url,
            elements: scan.elements,
        })
    }

    async fn fetch_subresources(
        &self,
        client: &reqwest::Client,
        sink: Option<&dyn ResponseSink>,
        context_hash: &str,
        subresources: &[Subresource],
    ) {
        let concurrency = self.settings.max_concurrent_fetches.max(1);
        let requests = subresources.iter().cloned().map(|res| {
            let request = client.get(res.url.as_str()).send();
            async move { (res, request.await) }
        });
        let mut responses = futures_util::stream::iter(requests).buffer_unordered(concurrency);
        while let Some((res, result)) = responses.next().await {
            match result {
                Ok(response) => {
                    let event = response_event(&response, res.resource_type, context_hash);
                    engine_trace!("{} {} -> {:?}", res.resource_type, res.url, event.status_code);
                    if let Some(sink) = sink {
                        sink.on_response(event);
                    }
                }
                Err(err) => engine_warn!("Request for {} failed: {}", res.url, err),
            }
        }
    }

    async fn perform_click(
        &self,
        id: SessionId,
        element: &InteractiveElement,
        new_tab_modifier: bool,
    ) -> Result<(), DriverError> {
        let base = self.main_tab_url(id)?;
        if !element.is_navigation_link() {
            engine_debug!("{}: clicked <{}> '{}', no navigation", id, element.tag, element.text);
            return Ok(());
        }
        let Some(target) = element
            .href
            .as_deref()
            .and_then(|href| resolve_href(&base, href))
        else {
            return Ok(());
        };

        let page = self.load_page(id, &target).await?;
        self.with_session(id, |s| {
            if element.opens_new_tab() || new_tab_modifier {
                let tab_id = TabId(s.next_tab);
                s.next_tab += 1;
                s.tabs.push(Tab {
                    id: tab_id,
                    url: page.final_url,
                    elements: page.elements,
                });
            } else if let Some(main) = s.tabs.first_mut() {
                main.url = page.final_url;
                main.elements = page.elements;
            }
            Ok(())
        })
    }
}

impl Default for HttpDriver {
    fn default() -> Self {
        Self::new(DriverSettings::default())
    }
}

#[async_trait::async_trait]
impl BrowserDriver for HttpDriver {
    async fn launch_isolated_session(&self, mode: BrowserMode) -> Result<SessionId, DriverError> {
        let profile = tempfile::Builder::new()
            .prefix("tagqa-profile-")
            .tempdir()
            .map_err(|err| DriverError::Launch(err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .user_agent(self.settings.user_agent.clone())
            .build()
            .map_err(|err| DriverError::Launch(err.to_string()))?;

        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        engine_info!(
            "Launched {} ({:?}) with profile {}",
            id,
            mode,
            profile.path().display()
        );
        self.sessions().insert(
            id,
            HttpSession {
                client,
                _profile: profile,
                sink: None,
                context_hash: String::new(),
                tabs: vec![Tab {
                    id: TabId(0),
                    url: "about:blank".to_string(),
                    elements: Vec::new(),
                }],
                next_tab: 1,
                closed: false,
            },
        );
        Ok(id)
    }

    async fn on_response(
        &self,
        session: SessionId,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<(), DriverError> {
        self.with_session(session, |s| {
            s.sink = Some(sink);
            Ok(())
        })
    }

    async fn navigate(&self, session: SessionId, url: &str) -> Result<(), DriverError> {
        let context_hash = short_hash(url);
        self.with_session(session, |s| {
            s.context_hash = context_hash;
            Ok(())
        })?;
        let page = self.load_page(session, url).await?;
        self.with_session(session, |s| {
            if let Some(main) = s.tabs.first_mut() {
                main.url = page.final_url;
                main.elements = page.elements;
            }
            Ok(())
        })
    }

    async fn screenshot(&self, session: SessionId) -> Result<Vec<u8>, DriverError> {
        self.with_session(session, |_| {
            Err(DriverError::Unsupported(
                "screenshots need a rendering browser".to_string(),
            ))
        })
    }

    async fn enumerate_interactive_elements(
        &self,
        session: SessionId,
    ) -> Result<Vec<InteractiveElement>, DriverError> {
        self.with_session(session, |s| {
            Ok(s.tabs
                .first()
                .map(|tab| tab.elements.clone())
                .unwrap_or_default())
        })
    }

    async fn click_by_id(&self, session: SessionId, id: &str) -> Result<(), DriverError> {
        let element = self.with_session(session, |s| {
            s.tabs
                .first()
                .and_then(|tab| {
                    tab.elements
                        .iter()
                        .find(|el| el.element_id.as_deref() == Some(id))
                        .cloned()
                })
                .ok_or_else(|| DriverError::ElementNotFound(id.to_string()))
        })?;
        if !element.is_actionable() {
            return Err(DriverError::ElementNotActionable(id.to_string()));
        }
        self.click_element(session, &element, ClickOptions::default())
            .await
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
        self.with_session(session, |s| {
            Ok(s.tabs
                .iter()
                .map(|tab| TabInfo {
                    id: tab.id,
                    url: tab.url.clone(),
                })
                .collect())
        })
    }

    async fn close_tab(&self, session: SessionId, tab: TabId) -> Result<(), DriverError> {
        self.with_session(session, |s| {
            if s.tabs.first().is_some_and(|main| main.id == tab) {
                engine_info!("{}: main tab closed, session ends", session);
                s.tabs.clear();
                s.closed = true;
            } else {
                s.tabs.retain(|t| t.id != tab);
            }
            Ok(())
        })
    }

    async fn close_session(&self, session: SessionId) -> Result<(), DriverError> {
        match self.sessions().remove(&session) {
            Some(_) => {
                engine_info!("Closed {}", session);
                Ok(())
            }
            None => Err(DriverError::UnknownSession(session)),
        }
    }
}

fn response_event(
    response: &reqwest::Response,
    resource_type: &str,
    context_hash: &str,
) -> NetworkEvent {
    let url = response.url().as_str();
    NetworkEvent {
        resource_name: NetworkEvent::resource_name_for(url),
        status_code: Some(response.status().as_u16()),
        method: "GET".to_string(),
        resource_type: resource_type.to_string(),
        size_bytes: response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok()),
        captured_at: Utc::now(),
        context_hash: context_hash.to_string(),
    }
}
