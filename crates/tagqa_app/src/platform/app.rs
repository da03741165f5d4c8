use std::future::Future;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use engine_logging::{engine_info, engine_warn};
use tagqa_core::{update, AppState, AppViewModel, Msg, RunPhase};
use tagqa_engine::{load_session, Workspace};

use super::effects::{EffectRunner, FileWritten};
use super::persistence::{load_preferences, save_preferences};
use super::{logging, render};
use crate::cli::Cli;

const TICK_INTERVAL: Duration = Duration::from_millis(75);
const INTERRUPTED_EXIT_CODE: i32 = 130;

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let config_dir = std::env::current_dir().context("reading the working directory")?;
    let mut prefs = load_preferences(&config_dir);

    let parent = cli
        .workspace
        .clone()
        .or_else(|| prefs.workspace_parent.clone())
        .unwrap_or_else(|| config_dir.clone());
    let mut workspace = Workspace::new(parent);
    if let Some(target) = &cli.relocate_to {
        workspace = workspace
            .relocate(target)
            .with_context(|| format!("moving the workspace to {}", target.display()))?;
    }
    workspace.bootstrap().context("creating workspace folders")?;
    logging::initialize(&workspace.logs(), cli.verbose);
    engine_info!("Workspace at {}", workspace.root().display());
    prefs.workspace_parent = Some(workspace.parent().to_path_buf());

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(
        workspace,
        cli.run_settings(),
        cli.driver_settings(),
        msg_tx.clone(),
    );
    let mut app = Foreground::new(AppState::with_settings(cli.core_settings()), runner);

    let session = cli
        .session
        .clone()
        .or_else(|| prefs.last_session.clone().filter(|path| path.is_file()));
    if let Some(path) = session {
        let contents = load_session(&path)
            .with_context(|| format!("loading session {}", path.display()))?;
        if contents.skipped > 0 {
            engine_warn!("Skipped {} unreadable records in {}", contents.skipped, path.display());
        }
        app.dispatch(Msg::SessionLoaded {
            urls: contents.urls,
            keywords: contents.keywords,
        });
        prefs.last_session = Some(path);
    }
    if !cli.urls.is_empty() {
        app.dispatch(Msg::UrlsPasted {
            raw: cli.urls.join("\n"),
            language: cli.lang,
            sequence: cli.num,
        });
    }
    if !cli.keywords.is_empty() {
        app.dispatch(Msg::KeywordsPasted {
            raw: cli.keywords.join("\n"),
            language: cli.lang,
            sequence: cli.num,
        });
    }

    let msg_tx_for_interrupts = msg_tx.clone();
    // Drives the debounced match recompute while the engine is busy.
    thread::spawn(move || {
        while msg_tx.send(Msg::Tick { now: Instant::now() }).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });

    spawn_interrupt_watcher(msg_tx_for_interrupts);
    app.dispatch(if cli.sweep {
        Msg::ElementSweepClicked
    } else {
        Msg::StartClicked
    });
    while app.state.run_phase() != RunPhase::Idle {
        let msg = msg_rx.recv().context("engine message channel closed")?;
        app.dispatch(msg);
    }
    app.dispatch(Msg::Tick {
        now: Instant::now() + cli.core_settings().debounce,
    });

    if cli.export_log {
        app.dispatch(Msg::ExportLogClicked);
    }
    if cli.save_session {
        for written in app.dispatch(Msg::SaveSessionClicked) {
            if let FileWritten::Session(path) = written {
                prefs.last_session = Some(path);
            }
        }
    }

    for line in render::summary(&app.state.view()) {
        println!("{line}");
    }
    save_preferences(&config_dir, &prefs);
    Ok(())
}

/// Ctrl-C closes the browser like the close button; a second Ctrl-C quits.
fn spawn_interrupt_watcher(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                engine_warn!("Ctrl-C handling unavailable: {}", err);
                return;
            }
        };
        if runtime.block_on(relay_interrupts(tokio::signal::ctrl_c, msg_tx)) {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });
}

/// Returns true once a second interrupt arrives after the close was sent.
async fn relay_interrupts<F, Fut>(mut next_interrupt: F, msg_tx: mpsc::Sender<Msg>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = next_interrupt().await {
        engine_warn!("Could not listen for Ctrl-C: {}", err);
        return false;
    }
    engine_warn!("Interrupted, closing the browser. Press Ctrl-C again to quit.");
    if msg_tx.send(Msg::CloseBrowserClicked).is_err() {
        return false;
    }
    next_interrupt().await.is_ok()
}

/// Owns the state and applies messages to it one at a time.
struct Foreground {
    state: AppState,
    last_view: Option<AppViewModel>,
    runner: EffectRunner,
}

impl Foreground {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        Self {
            state,
            last_view: None,
            runner,
        }
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<FileWritten> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            let view = state.view();
            for line in render::render(self.last_view.as_ref(), &view) {
                println!("{line}");
            }
            self.last_view = Some(view);
        }
        self.state = state;
        self.runner.enqueue(effects)
    }
}
