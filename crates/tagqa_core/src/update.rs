use crate::display::{parse_keyword_row, parse_url_row};
use crate::editor::{pasted_lines, EditError};
use crate::{
    AppState, Effect, KeywordSpec, LanguageCode, Msg, RunOutcome, SequenceNumber, Severity,
    UrlSpec,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::KeywordAdded(keyword) => {
            let result = state.keyword_list_mut().add(keyword);
            after_keyword_edit(&mut state, result)
        }
        Msg::KeywordEdited { index, keyword } => {
            let result = state.keyword_list_mut().replace(index, keyword);
            after_keyword_edit(&mut state, result)
        }
        Msg::KeywordRemoved { index } => {
            let result = state.keyword_list_mut().remove(index).map(drop);
            if result.is_ok() {
                state.set_filter(None);
            }
            after_keyword_edit(&mut state, result)
        }
        Msg::KeywordsCleared => {
            if state.keyword_list_mut().clear() {
                state.set_filter(None);
                state.refresh_matches();
            }
            Vec::new()
        }
        Msg::KeywordsPasted {
            raw,
            language,
            sequence,
        } => {
            let records = pasted_keywords(&raw, language, sequence);
            let stats = state.keyword_list_mut().paste(records);
            state.set_last_paste(stats);
            if stats.added > 0 {
                state.refresh_matches();
            }
            Vec::new()
        }
        Msg::KeywordUndo => {
            if state.keyword_list_mut().undo() {
                drop_stale_filter(&mut state);
                state.refresh_matches();
            }
            Vec::new()
        }
        Msg::KeywordRedo => {
            if state.keyword_list_mut().redo() {
                drop_stale_filter(&mut state);
                state.refresh_matches();
            }
            Vec::new()
        }
        Msg::KeywordClicked { index } => {
            let clicked = index
                .and_then(|i| state.keywords().get(i))
                .map(|kw| kw.text.clone());
            let next = match clicked {
                Some(text) if state.active_filter() == Some(text.as_str()) => None,
                other => other,
            };
            state.set_filter(next);
            Vec::new()
        }
        Msg::UrlAdded(url) => {
            let result = state.url_list_mut().add(url);
            after_url_edit(&mut state, result)
        }
        Msg::UrlEdited { index, url } => {
            let result = state.url_list_mut().replace(index, url);
            after_url_edit(&mut state, result)
        }
        Msg::UrlRemoved { index } => {
            let result = state.url_list_mut().remove(index).map(drop);
            after_url_edit(&mut state, result)
        }
        Msg::UrlsPasted {
            raw,
            language,
            sequence,
        } => {
            let records = pasted_urls(&raw, language, sequence);
            let stats = state.url_list_mut().paste(records);
            state.set_last_paste(stats);
            Vec::new()
        }
        Msg::UrlUndo => {
            if state.url_list_mut().undo() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::UrlRedo => {
            if state.url_list_mut().redo() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SessionLoaded { urls, keywords } => {
            let dropped =
                state.url_list_mut().load(urls) + state.keyword_list_mut().load(keywords);
            state.set_filter(None);
            state.refresh_matches();
            let message = format!(
                "Loaded {} URLs and {} keywords",
                state.urls().len(),
                state.keywords().len()
            );
            if dropped > 0 {
                vec![Effect::warn(format!(
                    "{message}; dropped {dropped} invalid or duplicate entries"
                ))]
            } else {
                vec![Effect::info(message)]
            }
        }
        Msg::SaveSessionClicked => {
            if state.keywords().is_empty() {
                vec![Effect::info("There are no keywords to save.")]
            } else {
                vec![Effect::SaveSession {
                    urls: state.urls().to_vec(),
                    keywords: state.keywords().to_vec(),
                }]
            }
        }
        Msg::ExportLogClicked => {
            if state.log().is_empty() {
                vec![Effect::warn("There is no log data to export.")]
            } else {
                vec![Effect::ExportLog {
                    events: state.log().snapshot().to_vec(),
                }]
            }
        }
        Msg::StartClicked => {
            if state.is_running() {
                Vec::new()
            } else if state.urls().is_empty() {
                vec![Effect::warn("Please add at least one URL before starting.")]
            } else if state.keywords().is_empty() {
                vec![Effect::warn("Please add at least one keyword before starting.")]
            } else {
                state.begin_run(state.urls().len());
                state.set_status("Starting test...");
                vec![Effect::StartRun {
                    urls: state.urls().to_vec(),
                    keywords: state.keywords().to_vec(),
                }]
            }
        }
        Msg::ElementSweepClicked => {
            if state.is_running() {
                Vec::new()
            } else {
                match state.urls().first().cloned() {
                    Some(url) => {
                        state.begin_sweep();
                        state.set_status(format!("Exploring elements on {}", url.url));
                        vec![Effect::StartElementSweep { url }]
                    }
                    None => vec![Effect::warn("Please add at least one URL before starting.")],
                }
            }
        }
        Msg::CloseBrowserClicked => {
            if state.is_running() {
                vec![Effect::CloseBrowser]
            } else {
                Vec::new()
            }
        }
        Msg::RunStatus(line) => {
            state.set_status(line);
            Vec::new()
        }
        Msg::UrlStarted { index, total, url } => {
            state.enter_url(index + 1, total);
            state.set_status(format!("Testing URL {}/{}: {}", index + 1, total, url.url));
            Vec::new()
        }
        Msg::NetworkEventCaptured { event, at } => {
            state.log_mut().append(event, at);
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick { now } => {
            if state.log_mut().recompute_due(now) {
                state.refresh_matches();
            }
            Vec::new()
        }
        Msg::CaptureSelectionRequested {
            request_id,
            keyword_text,
        } => {
            // The capture must see every event logged so far.
            state.log_mut().settle();
            state.refresh_matches();
            let listed = state.keywords().iter().any(|kw| kw.text == keyword_text);
            if listed {
                state.set_filter(Some(keyword_text.clone()));
            }
            vec![Effect::ResolveCaptureSelection {
                request_id,
                status: state.status_of(&keyword_text),
            }]
        }
        Msg::RowCaptured(row) => {
            state.push_row(row);
            Vec::new()
        }
        Msg::UrlFailed { url, reason } => {
            state.set_status(format!("Failed to test {url}: {reason}"));
            state.record_failed_url(url, reason);
            Vec::new()
        }
        Msg::RunFinished(outcome) => finish_run(&mut state, outcome),
        Msg::SweepFinished { summary } => {
            state.finish_sweep();
            state.set_status(summary.clone());
            vec![Effect::info(summary)]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn after_keyword_edit(state: &mut AppState, result: Result<(), EditError>) -> Vec<Effect> {
    match result {
        Ok(()) => {
            drop_stale_filter(state);
            state.refresh_matches();
            Vec::new()
        }
        Err(err) => vec![Effect::warn(err.to_string())],
    }
}

fn after_url_edit(state: &mut AppState, result: Result<(), EditError>) -> Vec<Effect> {
    match result {
        Ok(()) => {
            state.mark_dirty();
            Vec::new()
        }
        Err(err) => vec![Effect::warn(err.to_string())],
    }
}

fn drop_stale_filter(state: &mut AppState) {
    let stale = state
        .active_filter()
        .is_some_and(|text| !state.keywords().iter().any(|kw| kw.text == text));
    if stale {
        state.set_filter(None);
    }
}

fn finish_run(state: &mut AppState, outcome: RunOutcome) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    let rows = state.assembled_report();
    if !rows.is_empty() {
        effects.push(Effect::RenderReport { rows });
    }

    let (severity, message) = match &outcome {
        RunOutcome::Completed {
            urls_total,
            urls_failed,
        } if urls_failed.is_empty() => (
            Severity::Info,
            format!("Test completed: {urls_total} URLs processed."),
        ),
        RunOutcome::Completed {
            urls_total,
            urls_failed,
        } => (
            Severity::Warning,
            format!(
                "Test completed with errors: {} of {} URLs could not be tested.",
                urls_failed.len(),
                urls_total
            ),
        ),
        RunOutcome::Aborted { reason } => (Severity::Error, format!("Test aborted: {reason}")),
    };
    state.set_status(message.clone());
    state.finish_run(outcome);
    effects.push(Effect::Notify { severity, message });
    effects
}

// Lines already in row form keep their own language and sequence.
fn pasted_keywords(raw: &str, language: LanguageCode, sequence: SequenceNumber) -> Vec<KeywordSpec> {
    pasted_lines(raw)
        .map(|line| {
            if line.starts_with('[') {
                parse_keyword_row(line)
            } else {
                KeywordSpec::new(line, language, sequence)
            }
        })
        .collect()
}

fn pasted_urls(raw: &str, language: LanguageCode, sequence: SequenceNumber) -> Vec<UrlSpec> {
    pasted_lines(raw)
        .map(|line| {
            if line.starts_with('[') {
                parse_url_row(line)
            } else {
                UrlSpec::new(line, language, sequence)
            }
        })
        .collect()
}
