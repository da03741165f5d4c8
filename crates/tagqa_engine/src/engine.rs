use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Duration;
use std::thread;

use engine_logging::{engine_error, engine_info, engine_warn};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use tagqa_core::{KeywordSpec, KeywordStatus, UrlSpec};

use crate::driver::BrowserDriver;
use crate::http_driver::{DriverSettings, HttpDriver};
use crate::run::{RunController, RunHost, RunSettings};
use crate::{DriverBackend, EngineEvent, RunEvent};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub run: RunSettings,
    pub driver: DriverSettings,
    pub captures_dir: PathBuf,
}

fn select_driver(settings: &DriverSettings) -> Arc<dyn BrowserDriver> {
    match settings.backend {
        DriverBackend::Http => Arc::new(HttpDriver::new(settings.clone())),
        #[cfg(feature = "browser")]
        DriverBackend::Chrome => {
            Arc::new(crate::chrome_driver::ChromeDriver::new(settings.clone()))
        }
        #[cfg(not(feature = "browser"))]
        DriverBackend::Chrome => {
            engine_warn!("Built without the `browser` feature, using the HTTP driver");
            Arc::new(HttpDriver::new(settings.clone()))
        }
    }
}

enum EngineCommand {
    StartRun {
        urls: Vec<UrlSpec>,
        keywords: Vec<KeywordSpec>,
    },
    ElementSweep {
        url: UrlSpec,
    },
    CloseBrowser,
}

/// Owns the engine thread. Commands go in, [`EngineEvent`]s come out.
///
/// Clones share the same thread and event queue.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    /// Starts the engine with the driver named in `config.driver.backend`.
    pub fn new(config: EngineConfig) -> Self {
        let driver = select_driver(&config.driver);
        Self::with_driver(driver, config)
    }

    pub fn with_driver(driver: Arc<dyn BrowserDriver>, config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let controller = Arc::new(RunController::new(
            driver,
            config.run,
            config.captures_dir,
        ));

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let mut active: Option<CancellationToken> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartRun { urls, keywords } => {
                        let cancel = fresh_token(&mut active);
                        let controller = controller.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let host: Arc<dyn RunHost> =
                                Arc::new(ChannelRunHost::new(event_tx.clone()));
                            let result = controller.run(&urls, &keywords, host, &cancel).await;
                            let _ = event_tx.send(EngineEvent::RunFinished(result));
                        });
                    }
                    EngineCommand::ElementSweep { url } => {
                        let cancel = fresh_token(&mut active);
                        let controller = controller.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let host: Arc<dyn RunHost> =
                                Arc::new(ChannelRunHost::new(event_tx.clone()));
                            let result = controller.sweep_elements(&url, host, &cancel).await;
                            let _ = event_tx.send(EngineEvent::SweepFinished(result));
                        });
                    }
                    EngineCommand::CloseBrowser => match active.take() {
                        Some(token) => {
                            engine_info!("Closing browser on request");
                            token.cancel();
                        }
                        None => engine_warn!("Close requested with no browser open"),
                    },
                }
            }
            engine_info!("Engine command channel closed; shutting down");
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn start_run(&self, urls: Vec<UrlSpec>, keywords: Vec<KeywordSpec>) {
        self.send(EngineCommand::StartRun { urls, keywords });
    }

    pub fn start_element_sweep(&self, url: UrlSpec) {
        self.send(EngineCommand::ElementSweep { url });
    }

    /// Ends the current run or sweep at its next checkpoint.
    pub fn close_browser(&self) {
        self.send(EngineCommand::CloseBrowser);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.events().try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.events().recv_timeout(timeout).ok()
    }

    fn events(&self) -> std::sync::MutexGuard<'_, mpsc::Receiver<EngineEvent>> {
        self.event_rx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_error!("Engine thread is gone; command dropped");
        }
    }
}

fn fresh_token(active: &mut Option<CancellationToken>) -> CancellationToken {
    let token = CancellationToken::new();
    *active = Some(token.clone());
    token
}

/// [`RunHost`] that posts to the foreground over the event channel.
pub struct ChannelRunHost {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelRunHost {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl RunHost for ChannelRunHost {
    fn emit(&self, event: RunEvent) {
        let _ = self.tx.send(EngineEvent::Run(event));
    }

    async fn select_keyword(&self, keyword_text: &str) -> KeywordStatus {
        let (reply, answer) = oneshot::channel();
        let request = EngineEvent::SelectionRequested {
            keyword_text: keyword_text.to_string(),
            reply,
        };
        if self.tx.send(request).is_err() {
            engine_warn!("Foreground is gone; '{}' captured unselected", keyword_text);
            return KeywordStatus::Standby;
        }
        match answer.await {
            Ok(status) => status,
            Err(_) => {
                engine_warn!("Selection of '{}' was dropped", keyword_text);
                KeywordStatus::Standby
            }
        }
    }
}
