use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use engine_logging::{engine_error, engine_info, engine_warn};
use tagqa_core::{Effect, KeywordStatus, Msg, RunOutcome, Severity};
use tagqa_engine::{
    export_log, save_session, timestamped_filename, DriverSettings, EngineConfig, EngineEvent,
    EngineHandle, MarkdownReportRenderer, ReportRenderer, RunEvent, RunSettings, Workspace,
};
use tokio::sync::oneshot;

use super::render;

/// How long the event pump blocks before checking that the foreground still listens.
const EVENT_WAIT: Duration = Duration::from_millis(250);

type PendingSelections = Arc<Mutex<HashMap<u64, oneshot::Sender<KeywordStatus>>>>;

/// Executes effects from `update` and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    workspace: Workspace,
    pending: PendingSelections,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(
        workspace: Workspace,
        run: RunSettings,
        driver: DriverSettings,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Self {
        let config = EngineConfig {
            run,
            driver,
            captures_dir: workspace.pictures(),
        };
        let runner = Self {
            engine: EngineHandle::new(config),
            workspace,
            pending: Arc::new(Mutex::new(HashMap::new())),
            msg_tx,
        };
        runner.spawn_event_loop();
        runner
    }

    /// Runs `effects` in order and returns the files written along the way.
    pub fn enqueue(&self, effects: Vec<Effect>) -> Vec<FileWritten> {
        let mut written = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartRun { urls, keywords } => {
                    engine_info!("Starting run: {} URLs, {} keywords", urls.len(), keywords.len());
                    self.engine.start_run(urls, keywords);
                }
                Effect::StartElementSweep { url } => {
                    engine_info!("Starting element sweep on {}", url.url);
                    self.engine.start_element_sweep(url);
                }
                Effect::CloseBrowser => self.engine.close_browser(),
                Effect::ResolveCaptureSelection { request_id, status } => {
                    let reply = self
                        .pending
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&request_id);
                    match reply {
                        Some(reply) => {
                            if reply.send(status).is_err() {
                                engine_warn!("Capture request {} was abandoned", request_id);
                            }
                        }
                        None => engine_warn!("No pending capture request {}", request_id),
                    }
                }
                Effect::RenderReport { rows } => {
                    let renderer = MarkdownReportRenderer::new(self.workspace.outputs());
                    match renderer.render(&rows, Local::now()) {
                        Ok(report) => {
                            if report.missing_images > 0 {
                                engine_warn!(
                                    "{} of {} report rows have no screenshot",
                                    report.missing_images,
                                    report.row_count
                                );
                            }
                            self.notify(
                                Severity::Info,
                                format!("Report saved to {}", report.report_path.display()),
                            );
                            written.push(FileWritten::Report);
                        }
                        Err(err) => self.notify(Severity::Error, format!("Failed to write report: {err}")),
                    }
                }
                Effect::ExportLog { events } => match export_log(&self.workspace.logs(), &events) {
                    Ok(path) => {
                        self.notify(Severity::Info, format!("Log exported to {}", path.display()));
                        written.push(FileWritten::Log);
                    }
                    Err(err) => self.notify(Severity::Error, format!("Failed to export log: {err}")),
                },
                Effect::SaveSession { urls, keywords } => {
                    let filename = timestamped_filename("session", "json", &Local::now());
                    match save_session(&self.workspace.sessions(), &filename, &urls, &keywords) {
                        Ok(path) => {
                            self.notify(Severity::Info, format!("Session saved to {}", path.display()));
                            written.push(FileWritten::Session(path));
                        }
                        Err(err) => {
                            self.notify(Severity::Error, format!("Failed to save session: {err}"))
                        }
                    }
                }
                Effect::Notify { severity, message } => self.notify(severity, message),
            }
        }
        written
    }

    fn notify(&self, severity: Severity, message: String) {
        match severity {
            Severity::Info => engine_info!("{}", message),
            Severity::Warning => engine_warn!("{}", message),
            Severity::Error => engine_error!("{}", message),
        }
        println!("{}", render::notification(severity, &message));
    }

    fn spawn_event_loop(&self) {
        let engine = self.engine.clone();
        let pending = self.pending.clone();
        let msg_tx = self.msg_tx.clone();
        thread::spawn(move || {
            let mut next_request = 1u64;
            loop {
                let Some(event) = engine.recv_timeout(EVENT_WAIT) else {
                    continue;
                };
                let msg = match event {
                    EngineEvent::SelectionRequested { keyword_text, reply } => {
                        let request_id = next_request;
                        next_request += 1;
                        pending
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(request_id, reply);
                        Msg::CaptureSelectionRequested {
                            request_id,
                            keyword_text,
                        }
                    }
                    other => map_event(other),
                };
                if msg_tx.send(msg).is_err() {
                    break;
                }
            }
        });
    }
}

/// Files the runner wrote in one `enqueue` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileWritten {
    Report,
    Log,
    Session(std::path::PathBuf),
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Run(RunEvent::Status(line)) => Msg::RunStatus(line),
        EngineEvent::Run(RunEvent::UrlStarted { index, total, url }) => {
            Msg::UrlStarted { index, total, url }
        }
        EngineEvent::Run(RunEvent::Response(event)) => Msg::NetworkEventCaptured {
            event,
            at: Instant::now(),
        },
        EngineEvent::Run(RunEvent::RowCaptured(row)) => Msg::RowCaptured(row),
        EngineEvent::Run(RunEvent::UrlFailed { url, reason }) => Msg::UrlFailed { url, reason },
        EngineEvent::RunFinished(Ok(summary)) => Msg::RunFinished(RunOutcome::Completed {
            urls_total: summary.urls.len(),
            urls_failed: summary.failed(),
        }),
        EngineEvent::RunFinished(Err(err)) => Msg::RunFinished(RunOutcome::Aborted {
            reason: err.to_string(),
        }),
        EngineEvent::SweepFinished(Ok(summary)) => Msg::SweepFinished {
            summary: summary.to_string(),
        },
        EngineEvent::SweepFinished(Err(err)) => Msg::SweepFinished {
            summary: format!("Element test aborted: {err}"),
        },
        EngineEvent::SelectionRequested { .. } => Msg::NoOp,
    }
}
