use std::fs;

use chrono::{Local, TimeZone};
use tempfile::TempDir;

use tagqa_core::{KeywordStatus, LanguageCode, ReportRow};
use tagqa_engine::{MarkdownReportRenderer, ReportError, ReportRenderer};

fn row(keyword: &str, status: KeywordStatus, screenshot: std::path::PathBuf) -> ReportRow {
    ReportRow {
        keyword_text: keyword.to_string(),
        language: LanguageCode::En,
        url: "https://www.example.com/en".to_string(),
        status,
        screenshot_path: screenshot,
    }
}

#[test]
fn report_lists_rows_in_given_order() {
    let temp = TempDir::new().unwrap();
    let capture = temp.path().join("capture_a.png");
    fs::write(&capture, b"png").unwrap();
    let renderer = MarkdownReportRenderer::new(temp.path().join("Outputs"));
    let at = Local.with_ymd_and_hms(2026, 5, 2, 14, 30, 0).unwrap();

    let rendered = renderer
        .render(
            &[
                row("hero_banner", KeywordStatus::Pass, capture.clone()),
                row("footer", KeywordStatus::Indeterminate, temp.path().join("gone.png")),
                row("promo", KeywordStatus::Failed, temp.path().join("gone2.png")),
            ],
            at,
        )
        .unwrap();

    assert_eq!(rendered.row_count, 3);
    assert_eq!(rendered.missing_images, 2);
    assert_eq!(
        rendered.report_path.file_name().unwrap(),
        "Test_Report_20260502_143000.md"
    );

    let doc = fs::read_to_string(&rendered.report_path).unwrap();
    assert!(doc.contains("| Keyword | Language | Status | URL | Screenshot |"));
    let body: Vec<_> = doc.lines().filter(|l| l.starts_with("| ") && !l.starts_with("| Keyword")).collect();
    assert_eq!(body.len(), 3);
    assert!(body[0].starts_with("| hero_banner | en | PASS |"));
    assert!(body[0].contains(&format!("]({})", capture.display())));
    assert!(body[1].starts_with("| footer | en | N/A |"));
    assert!(body[1].ends_with("Image not found |"));
    assert!(body[2].starts_with("| promo | en | FAILED |"));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&rendered.manifest_path).unwrap()).unwrap();
    assert_eq!(manifest["row_count"], 3);
    assert_eq!(manifest["rows"][2]["status"], "FAILED");
}

#[test]
fn empty_report_is_refused() {
    let temp = TempDir::new().unwrap();
    let renderer = MarkdownReportRenderer::new(temp.path().to_path_buf());
    assert!(matches!(
        renderer.render(&[], Local::now()),
        Err(ReportError::NoRows)
    ));
}
