use std::sync::Once;

use pretty_assertions::assert_eq;
use tagqa_core::{
    update, AppState, Effect, KeywordSpec, KeywordStatus, LanguageCode, Msg, PasteStats,
    RunPhase, Severity, UrlSpec,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn apply(state: AppState, msgs: Vec<Msg>) -> AppState {
    msgs.into_iter().fold(state, |state, msg| update(state, msg).0)
}

fn warning(message: &str) -> Effect {
    Effect::Notify {
        severity: Severity::Warning,
        message: message.to_string(),
    }
}

#[test]
fn adding_keyword_renders_row_and_marks_dirty() {
    init_logging();
    let (mut state, effects) = update(
        AppState::new(),
        Msg::KeywordAdded(KeywordSpec::new("banner", LanguageCode::Sc, 2).with_element_id("cta")),
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.keyword_rows[0].text, "[2] [sc] banner {cta}");
    assert_eq!(view.keyword_rows[0].status, KeywordStatus::Standby);
    assert!(view.can_undo_keywords);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn invalid_keyword_surfaces_warning_and_keeps_state() {
    init_logging();
    let state = apply(
        AppState::new(),
        vec![Msg::KeywordAdded(KeywordSpec::new("banner", LanguageCode::Tc, 1))],
    );
    let before = state.keywords().to_vec();

    let (state, effects) = update(
        state,
        Msg::KeywordAdded(KeywordSpec::new("banner", LanguageCode::Tc, 1)),
    );

    assert_eq!(state.keywords(), before.as_slice());
    assert_eq!(
        effects,
        vec![warning("keyword 'banner' [tc] #1 already exists")]
    );
}

#[test]
fn keyword_paste_applies_defaults_and_reports_stats() {
    init_logging();
    let state = apply(
        AppState::new(),
        vec![Msg::KeywordAdded(KeywordSpec::new("hero", LanguageCode::En, 3))],
    );

    let (state, effects) = update(
        state,
        Msg::KeywordsPasted {
            raw: "hero\n\n  footer  \n[4] [sc] badge {b-1}\nfooter\n".to_string(),
            language: LanguageCode::En,
            sequence: 3,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(
        state.keywords(),
        &[
            KeywordSpec::new("hero", LanguageCode::En, 3),
            KeywordSpec::new("footer", LanguageCode::En, 3),
            KeywordSpec::new("badge", LanguageCode::Sc, 4).with_element_id("b-1"),
        ]
    );
    assert_eq!(
        state.view().last_paste_stats,
        Some(PasteStats {
            added: 2,
            skipped: 2
        })
    );
}

#[test]
fn clicking_keyword_toggles_filter() {
    init_logging();
    let state = apply(
        AppState::new(),
        vec![
            Msg::KeywordAdded(KeywordSpec::new("hero", LanguageCode::Tc, 1)),
            Msg::KeywordAdded(KeywordSpec::new("footer", LanguageCode::Tc, 1)),
            Msg::KeywordClicked { index: Some(1) },
        ],
    );
    assert_eq!(state.active_filter(), Some("footer"));
    assert!(state.view().keyword_rows[1].selected);

    let state = apply(state, vec![Msg::KeywordClicked { index: Some(1) }]);
    assert_eq!(state.active_filter(), None);

    let state = apply(
        state,
        vec![
            Msg::KeywordClicked { index: Some(0) },
            Msg::KeywordClicked { index: None },
        ],
    );
    assert_eq!(state.active_filter(), None);
}

#[test]
fn removing_keyword_clears_filter() {
    init_logging();
    let state = apply(
        AppState::new(),
        vec![
            Msg::KeywordAdded(KeywordSpec::new("hero", LanguageCode::Tc, 1)),
            Msg::KeywordAdded(KeywordSpec::new("footer", LanguageCode::Tc, 1)),
            Msg::KeywordClicked { index: Some(0) },
            Msg::KeywordRemoved { index: 1 },
        ],
    );

    assert_eq!(state.active_filter(), None);
}

#[test]
fn undo_drops_filter_for_vanished_keyword() {
    init_logging();
    let state = apply(
        AppState::new(),
        vec![
            Msg::KeywordAdded(KeywordSpec::new("hero", LanguageCode::Tc, 1)),
            Msg::KeywordAdded(KeywordSpec::new("footer", LanguageCode::Tc, 1)),
            Msg::KeywordClicked { index: Some(1) },
            Msg::KeywordUndo,
        ],
    );
    assert_eq!(state.keywords().len(), 1);
    assert_eq!(state.active_filter(), None);

    let state = apply(state, vec![Msg::KeywordRedo]);
    assert_eq!(state.keywords().len(), 2);
}

#[test]
fn url_lists_have_independent_history() {
    init_logging();
    let state = apply(
        AppState::new(),
        vec![
            Msg::UrlAdded(UrlSpec::new("https://a.test", LanguageCode::Tc, 1)),
            Msg::KeywordAdded(KeywordSpec::new("hero", LanguageCode::Tc, 1)),
            Msg::UrlUndo,
        ],
    );

    assert!(state.urls().is_empty());
    assert_eq!(state.keywords().len(), 1);
    assert!(state.view().can_redo_urls);
    assert!(!state.view().can_redo_keywords);
}

#[test]
fn url_paste_skips_known_urls() {
    init_logging();
    let state = apply(
        AppState::new(),
        vec![
            Msg::UrlAdded(UrlSpec::new("https://a.test", LanguageCode::Tc, 1)),
            Msg::UrlsPasted {
                raw: "https://a.test\nhttps://b.test\n[2] [en] https://c.test".to_string(),
                language: LanguageCode::Sc,
                sequence: 5,
            },
        ],
    );

    assert_eq!(
        state.urls(),
        &[
            UrlSpec::new("https://a.test", LanguageCode::Tc, 1),
            UrlSpec::new("https://b.test", LanguageCode::Sc, 5),
            UrlSpec::new("https://c.test", LanguageCode::En, 2),
        ]
    );
    assert_eq!(state.view().url_rows[2], "[2] [en] https://c.test");
}

#[test]
fn start_requires_urls_and_keywords() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::StartClicked);
    assert_eq!(
        effects,
        vec![warning("Please add at least one URL before starting.")]
    );

    let state = apply(
        state,
        vec![Msg::UrlAdded(UrlSpec::new("https://a.test", LanguageCode::Tc, 1))],
    );
    let (state, effects) = update(state, Msg::StartClicked);
    assert_eq!(
        effects,
        vec![warning("Please add at least one keyword before starting.")]
    );
    assert_eq!(state.run_phase(), RunPhase::Idle);
}

#[test]
fn save_and_export_refuse_empty_content() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::SaveSessionClicked);
    assert_eq!(
        effects,
        vec![Effect::Notify {
            severity: Severity::Info,
            message: "There are no keywords to save.".to_string(),
        }]
    );

    let (_, effects) = update(state, Msg::ExportLogClicked);
    assert_eq!(effects, vec![warning("There is no log data to export.")]);
}

#[test]
fn session_load_replaces_both_lists() {
    init_logging();
    let keywords = vec![KeywordSpec::new("hero", LanguageCode::En, 2)];
    let urls = vec![UrlSpec::new("https://a.test/en", LanguageCode::En, 2)];

    let (state, effects) = update(
        AppState::new(),
        Msg::SessionLoaded {
            urls: urls.clone(),
            keywords: keywords.clone(),
        },
    );

    assert_eq!(state.keywords(), keywords.as_slice());
    assert_eq!(state.urls(), urls.as_slice());
    assert_eq!(
        effects,
        vec![Effect::Notify {
            severity: Severity::Info,
            message: "Loaded 1 URLs and 1 keywords".to_string(),
        }]
    );

    let (_, effects) = update(state, Msg::SaveSessionClicked);
    assert_eq!(effects, vec![Effect::SaveSession { urls, keywords }]);
}

#[test]
fn session_load_reports_dropped_duplicates() {
    init_logging();
    let keywords = vec![
        KeywordSpec::new("hero", LanguageCode::En, 2),
        KeywordSpec::new("hero", LanguageCode::En, 2),
    ];
    let urls = vec![UrlSpec::new("https://a.test/en", LanguageCode::En, 2)];

    let (state, effects) = update(AppState::new(), Msg::SessionLoaded { urls, keywords });

    assert_eq!(state.keywords().len(), 1);
    assert_eq!(
        effects,
        vec![warning(
            "Loaded 1 URLs and 1 keywords; dropped 1 invalid or duplicate entries"
        )]
    );
}
