//! Console rendering of the view model.

use tagqa_core::{AppViewModel, KeywordStatus, RunPhase, Severity};

/// Lines describing what changed since the previous frame.
pub(crate) fn render(previous: Option<&AppViewModel>, view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    if previous.map(|p| &p.status_line) != Some(&view.status_line) {
        lines.push(format!("{} {}", phase_label(view.run), view.status_line));
    }
    if previous.map(|p| &p.keyword_rows) != Some(&view.keyword_rows) {
        for row in &view.keyword_rows {
            if row.status != KeywordStatus::Standby || row.selected {
                let marker = if row.selected { "> " } else { "  " };
                lines.push(format!("  {marker}{}", row.text));
            }
        }
    }
    if let Some(stats) = view.last_paste_stats {
        if previous.and_then(|p| p.last_paste_stats) != Some(stats) {
            lines.push(format!(
                "  pasted {} new, {} skipped",
                stats.added, stats.skipped
            ));
        }
    }
    lines
}

/// Full listing of both lists with their final verdicts.
pub(crate) fn summary(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![format!(
        "{} URLs, {} keywords, {} responses logged, {} report rows",
        view.url_rows.len(),
        view.keyword_rows.len(),
        view.log_len,
        view.report_row_count
    )];
    lines.extend(view.url_rows.iter().map(|row| format!("  {row}")));
    lines.extend(view.keyword_rows.iter().map(|row| format!("  {}", row.text)));
    lines
}

pub(crate) fn notification(severity: Severity, message: &str) -> String {
    let tag = match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    format!("[{tag}] {message}")
}

fn phase_label(phase: RunPhase) -> String {
    match phase {
        RunPhase::Idle => "[idle]".to_string(),
        RunPhase::Running { current, total } => format!("[{current}/{total}]"),
        RunPhase::ElementSweep => "[sweep]".to_string(),
    }
}
