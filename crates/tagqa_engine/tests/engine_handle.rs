mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use tagqa_core::{KeywordSpec, KeywordStatus, LanguageCode, UrlSpec};
use tagqa_engine::{
    EngineConfig, EngineEvent, EngineHandle, RunError, RunEvent, RunSettings,
};

use common::{response, ScriptedDriver, ScriptedPage};

const PAGE: &str = "https://www.example.com/";

fn fast_settings() -> RunSettings {
    RunSettings {
        idle_interval: Duration::from_millis(20),
        url_settle: Duration::from_millis(1),
        selection_settle: Duration::from_millis(1),
        ..RunSettings::default()
    }
}

fn handle(captures: &TempDir) -> (EngineHandle, Arc<ScriptedDriver>) {
    let driver = Arc::new(ScriptedDriver::new().with_page(
        PAGE,
        ScriptedPage {
            responses: vec![response("hero.png", Some(200))],
            ..ScriptedPage::default()
        },
    ));
    let config = EngineConfig {
        run: fast_settings(),
        captures_dir: captures.path().to_path_buf(),
        ..EngineConfig::default()
    };
    (EngineHandle::with_driver(driver.clone(), config), driver)
}

/// Drains events until `done` matches one, answering selections with `reply`.
fn pump(
    engine: &EngineHandle,
    reply: Option<KeywordStatus>,
    done: impl Fn(&EngineEvent) -> bool,
) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        match engine.recv_timeout(Duration::from_millis(50)) {
            Some(EngineEvent::SelectionRequested { keyword_text, reply: tx }) => {
                if let Some(status) = reply {
                    let _ = tx.send(status);
                }
                seen.push(EngineEvent::Run(RunEvent::Status(format!("selected {keyword_text}"))));
            }
            Some(event) => {
                let finished = done(&event);
                seen.push(event);
                if finished {
                    return seen;
                }
            }
            None => {}
        }
    }
    panic!("engine did not finish in time");
}

#[test]
fn run_round_trips_through_the_engine_thread() {
    engine_logging::initialize_for_tests();
    let captures = TempDir::new().unwrap();
    let (engine, _driver) = handle(&captures);

    engine.start_run(
        vec![UrlSpec::new(PAGE, LanguageCode::En, 1)],
        vec![KeywordSpec::new("hero", LanguageCode::En, 1)],
    );
    let events = pump(&engine, Some(KeywordStatus::Pass), |e| {
        matches!(e, EngineEvent::RunFinished(_))
    });

    let row_status = events.iter().find_map(|e| match e {
        EngineEvent::Run(RunEvent::RowCaptured(row)) => Some(row.status),
        _ => None,
    });
    assert_eq!(row_status, Some(KeywordStatus::Pass));
    match events.last() {
        Some(EngineEvent::RunFinished(Ok(summary))) => assert_eq!(summary.rows_captured, 1),
        other => panic!("unexpected final event {other:?}"),
    }
}

#[test]
fn dropped_selection_reply_captures_as_standby() {
    let captures = TempDir::new().unwrap();
    let (engine, _driver) = handle(&captures);

    engine.start_run(
        vec![UrlSpec::new(PAGE, LanguageCode::En, 1)],
        vec![KeywordSpec::new("hero", LanguageCode::En, 1)],
    );
    let events = pump(&engine, None, |e| matches!(e, EngineEvent::RunFinished(_)));

    let row_status = events.iter().find_map(|e| match e {
        EngineEvent::Run(RunEvent::RowCaptured(row)) => Some(row.status),
        _ => None,
    });
    assert_eq!(row_status, Some(KeywordStatus::Standby));
}

#[test]
fn close_browser_ends_the_run() {
    let captures = TempDir::new().unwrap();
    let (engine, driver) = handle(&captures);

    engine.start_run(
        vec![UrlSpec::new(PAGE, LanguageCode::En, 1)],
        vec![KeywordSpec::new("hero", LanguageCode::En, 1)],
    );
    // Hold the selection until the browser is closed.
    let deadline = Instant::now() + Duration::from_secs(10);
    let pending = loop {
        assert!(Instant::now() < deadline, "no selection request");
        match engine.try_recv() {
            Some(EngineEvent::SelectionRequested { reply, .. }) => break reply,
            Some(_) => {}
            None => std::thread::sleep(Duration::from_millis(5)),
        }
    };
    engine.close_browser();
    std::thread::sleep(Duration::from_millis(50));
    let _ = pending.send(KeywordStatus::Pass);

    let events = pump(&engine, None, |e| matches!(e, EngineEvent::RunFinished(_)));
    assert!(matches!(
        events.last(),
        Some(EngineEvent::RunFinished(Err(RunError::BrowserClosed)))
    ));
    assert_eq!(driver.open_sessions(), 0);
}
