use std::path::PathBuf;
use std::sync::Once;
use std::time::{Duration, Instant};

use chrono::Utc;
use pretty_assertions::assert_eq;
use tagqa_core::{
    update, AppState, Effect, KeywordSpec, KeywordStatus, LanguageCode, Msg, NetworkEvent,
    ReportRow, RunOutcome, RunPhase, Severity, UrlSpec,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn apply(state: AppState, msgs: Vec<Msg>) -> AppState {
    msgs.into_iter().fold(state, |state, msg| update(state, msg).0)
}

fn event(name: &str, status: u16) -> NetworkEvent {
    NetworkEvent {
        resource_name: name.to_string(),
        status_code: Some(status),
        method: "GET".to_string(),
        resource_type: "image".to_string(),
        size_bytes: None,
        captured_at: Utc::now(),
        context_hash: "1234abcd".to_string(),
    }
}

fn url_a() -> UrlSpec {
    UrlSpec::new("https://a.test/", LanguageCode::Tc, 1)
}

fn url_b() -> UrlSpec {
    UrlSpec::new("https://b.test/", LanguageCode::Tc, 1)
}

fn ready_state() -> AppState {
    apply(
        AppState::new(),
        vec![
            Msg::UrlAdded(url_a()),
            Msg::UrlAdded(url_b()),
            Msg::KeywordAdded(KeywordSpec::new("hero", LanguageCode::Tc, 1)),
            Msg::KeywordAdded(KeywordSpec::new("pixel", LanguageCode::Tc, 1)),
        ],
    )
}

fn row(keyword: &str, url: &UrlSpec) -> ReportRow {
    ReportRow {
        keyword_text: keyword.to_string(),
        language: LanguageCode::Tc,
        url: url.url.clone(),
        status: KeywordStatus::Pass,
        screenshot_path: PathBuf::from("capture.png"),
    }
}

#[test]
fn start_emits_snapshot_of_lists() {
    init_logging();
    let state = ready_state();
    let (state, effects) = update(state, Msg::StartClicked);

    assert_eq!(state.run_phase(), RunPhase::Running { current: 0, total: 2 });
    assert_eq!(
        effects,
        vec![Effect::StartRun {
            urls: vec![url_a(), url_b()],
            keywords: state.keywords().to_vec(),
        }]
    );

    let (_, effects) = update(state, Msg::StartClicked);
    assert!(effects.is_empty());
}

#[test]
fn recompute_waits_for_quiet_window() {
    init_logging();
    let t0 = Instant::now();
    let state = apply(ready_state(), vec![Msg::StartClicked]);
    let state = apply(
        state,
        vec![
            Msg::UrlStarted {
                index: 0,
                total: 2,
                url: url_a(),
            },
            Msg::NetworkEventCaptured {
                event: event("hero.png", 200),
                at: t0,
            },
            Msg::NetworkEventCaptured {
                event: event("hero.png", 404),
                at: t0 + Duration::from_millis(300),
            },
            Msg::Tick {
                now: t0 + Duration::from_millis(600),
            },
        ],
    );
    assert_eq!(state.log().len(), 2);
    assert_eq!(state.status_of("hero"), KeywordStatus::Standby);
    assert!(state.log().recompute_pending());

    let state = apply(
        state,
        vec![Msg::Tick {
            now: t0 + Duration::from_millis(800),
        }],
    );
    assert_eq!(state.status_of("hero"), KeywordStatus::Failed);
    assert!(!state.log().recompute_pending());
}

#[test]
fn capture_request_flushes_and_selects_keyword() {
    init_logging();
    let t0 = Instant::now();
    let state = apply(
        ready_state(),
        vec![
            Msg::StartClicked,
            Msg::UrlStarted {
                index: 0,
                total: 2,
                url: url_a(),
            },
            Msg::NetworkEventCaptured {
                event: event("hero_1.png", 200),
                at: t0,
            },
            Msg::NetworkEventCaptured {
                event: event("other.css", 200),
                at: t0,
            },
        ],
    );

    let (state, effects) = update(
        state,
        Msg::CaptureSelectionRequested {
            request_id: 7,
            keyword_text: "hero".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::ResolveCaptureSelection {
            request_id: 7,
            status: KeywordStatus::Pass,
        }]
    );
    assert_eq!(state.active_filter(), Some("hero"));
    let view = state.view();
    assert_eq!(view.keyword_rows[0].text, "[1] [tc] hero (PASS)");
    assert_eq!(view.visible_log.len(), 1);
    assert_eq!(view.log_len, 2);
}

#[test]
fn capture_request_for_unlisted_keyword_still_resolves() {
    init_logging();
    let state = apply(ready_state(), vec![Msg::StartClicked]);

    let (state, effects) = update(
        state,
        Msg::CaptureSelectionRequested {
            request_id: 1,
            keyword_text: "deleted-meanwhile".to_string(),
        },
    );

    assert_eq!(state.active_filter(), None);
    assert_eq!(
        effects,
        vec![Effect::ResolveCaptureSelection {
            request_id: 1,
            status: KeywordStatus::Standby,
        }]
    );
}

#[test]
fn next_url_resets_log_and_filter() {
    init_logging();
    let state = apply(
        ready_state(),
        vec![
            Msg::StartClicked,
            Msg::UrlStarted {
                index: 0,
                total: 2,
                url: url_a(),
            },
            Msg::NetworkEventCaptured {
                event: event("hero.png", 200),
                at: Instant::now(),
            },
            Msg::CaptureSelectionRequested {
                request_id: 1,
                keyword_text: "hero".to_string(),
            },
            Msg::UrlStarted {
                index: 1,
                total: 2,
                url: url_b(),
            },
        ],
    );

    assert!(state.log().is_empty());
    assert_eq!(state.active_filter(), None);
    assert_eq!(state.status_of("hero"), KeywordStatus::Standby);
    assert_eq!(state.run_phase(), RunPhase::Running { current: 2, total: 2 });
    assert_eq!(state.status_line(), "Testing URL 2/2: https://b.test/");
}

#[test]
fn finished_run_renders_ordered_report() {
    init_logging();
    let state = apply(
        ready_state(),
        vec![
            Msg::StartClicked,
            Msg::RowCaptured(row("pixel", &url_a())),
            Msg::RowCaptured(row("hero", &url_b())),
            Msg::RowCaptured(row("hero", &url_a())),
        ],
    );

    let (state, effects) = update(
        state,
        Msg::RunFinished(RunOutcome::Completed {
            urls_total: 2,
            urls_failed: Vec::new(),
        }),
    );

    assert_eq!(state.run_phase(), RunPhase::Idle);
    assert_eq!(
        effects,
        vec![
            Effect::RenderReport {
                rows: vec![row("hero", &url_a()), row("hero", &url_b()), row("pixel", &url_a())],
            },
            Effect::Notify {
                severity: Severity::Info,
                message: "Test completed: 2 URLs processed.".to_string(),
            },
        ]
    );
}

#[test]
fn failed_urls_downgrade_summary_to_warning() {
    init_logging();
    let failure = ("https://b.test/".to_string(), "connection refused".to_string());
    let state = apply(
        ready_state(),
        vec![
            Msg::StartClicked,
            Msg::UrlFailed {
                url: failure.0.clone(),
                reason: failure.1.clone(),
            },
        ],
    );
    assert_eq!(state.failed_urls(), &[failure.clone()]);

    let (_, effects) = update(
        state,
        Msg::RunFinished(RunOutcome::Completed {
            urls_total: 2,
            urls_failed: vec![failure],
        }),
    );

    assert_eq!(
        effects,
        vec![Effect::Notify {
            severity: Severity::Warning,
            message: "Test completed with errors: 1 of 2 URLs could not be tested.".to_string(),
        }]
    );
}

#[test]
fn closing_browser_is_forwarded_only_while_running() {
    init_logging();
    let (state, effects) = update(ready_state(), Msg::CloseBrowserClicked);
    assert!(effects.is_empty());

    let state = apply(state, vec![Msg::StartClicked]);
    let (state, effects) = update(state, Msg::CloseBrowserClicked);
    assert_eq!(effects, vec![Effect::CloseBrowser]);

    let (state, effects) = update(
        state,
        Msg::RunFinished(RunOutcome::Aborted {
            reason: "browser was closed".to_string(),
        }),
    );
    assert_eq!(
        effects,
        vec![Effect::Notify {
            severity: Severity::Error,
            message: "Test aborted: browser was closed".to_string(),
        }]
    );
    assert!(matches!(
        state.last_outcome(),
        Some(RunOutcome::Aborted { .. })
    ));
}

#[test]
fn element_sweep_targets_first_url() {
    init_logging();
    let (state, effects) = update(ready_state(), Msg::ElementSweepClicked);

    assert_eq!(state.run_phase(), RunPhase::ElementSweep);
    assert_eq!(effects, vec![Effect::StartElementSweep { url: url_a() }]);

    let (state, _) = update(
        state,
        Msg::SweepFinished {
            summary: "Explored 3 of 4 elements".to_string(),
        },
    );
    assert_eq!(state.run_phase(), RunPhase::Idle);
}

#[test]
fn export_hands_over_full_log() {
    init_logging();
    let state = apply(
        ready_state(),
        vec![
            Msg::NetworkEventCaptured {
                event: event("a.png", 200),
                at: Instant::now(),
            },
            Msg::NetworkEventCaptured {
                event: event("b.png", 500),
                at: Instant::now(),
            },
        ],
    );

    let (_, effects) = update(state.clone(), Msg::ExportLogClicked);

    assert_eq!(
        effects,
        vec![Effect::ExportLog {
            events: state.log().snapshot().to_vec(),
        }]
    );
}
