use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tagqa_core::{KeywordSpec, KeywordStatus, LanguageCode, ReportAssembler, ReportRow, UrlSpec};

fn row(keyword: &str, url: &str) -> ReportRow {
    ReportRow {
        keyword_text: keyword.to_string(),
        language: LanguageCode::Tc,
        url: url.to_string(),
        status: KeywordStatus::Pass,
        screenshot_path: PathBuf::from(format!("{keyword}.png")),
    }
}

fn pairs(rows: &[ReportRow]) -> Vec<(&str, &str)> {
    rows.iter()
        .map(|r| (r.keyword_text.as_str(), r.url.as_str()))
        .collect()
}

#[test]
fn rows_group_by_keyword_then_url() {
    let keywords = vec![
        KeywordSpec::new("hero", LanguageCode::Tc, 1),
        KeywordSpec::new("footer", LanguageCode::Tc, 1),
    ];
    let urls = vec![
        UrlSpec::new("https://a.test", LanguageCode::Tc, 1),
        UrlSpec::new("https://b.test", LanguageCode::Tc, 1),
    ];
    let captured = vec![
        row("hero", "https://b.test"),
        row("footer", "https://a.test"),
        row("footer", "https://b.test"),
        row("hero", "https://a.test"),
    ];

    let ordered = ReportAssembler::new(&keywords, &urls).assemble(captured);

    assert_eq!(
        pairs(&ordered),
        vec![
            ("hero", "https://a.test"),
            ("hero", "https://b.test"),
            ("footer", "https://a.test"),
            ("footer", "https://b.test"),
        ]
    );
}

#[test]
fn unknown_keywords_sort_last_in_capture_order() {
    let keywords = vec![KeywordSpec::new("hero", LanguageCode::Tc, 1)];
    let urls = vec![UrlSpec::new("https://a.test", LanguageCode::Tc, 1)];
    let captured = vec![
        row("removed-2", "https://a.test"),
        row("removed-1", "https://a.test"),
        row("hero", "https://elsewhere.test"),
        row("hero", "https://a.test"),
    ];

    let ordered = ReportAssembler::new(&keywords, &urls).assemble(captured);

    assert_eq!(
        pairs(&ordered),
        vec![
            ("hero", "https://a.test"),
            ("hero", "https://elsewhere.test"),
            ("removed-2", "https://a.test"),
            ("removed-1", "https://a.test"),
        ]
    );
}
