use crate::NetworkEvent;

/// Verdict for one keyword, derived from the events it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeywordStatus {
    /// Nothing matched yet.
    #[default]
    Standby,
    Pass,
    Failed,
    /// No 4xx seen, but something was not a clean 2xx/3xx.
    Indeterminate,
}

impl KeywordStatus {
    pub fn name(self) -> &'static str {
        match self {
            KeywordStatus::Standby => "STANDBY",
            KeywordStatus::Pass => "PASS",
            KeywordStatus::Failed => "FAILED",
            KeywordStatus::Indeterminate => "INDETERMINATE",
        }
    }

    /// Suffix shown after a keyword row. Only definite verdicts get one.
    pub fn row_suffix(self) -> Option<&'static str> {
        match self {
            KeywordStatus::Pass => Some("PASS"),
            KeywordStatus::Failed => Some("FAILED"),
            KeywordStatus::Standby | KeywordStatus::Indeterminate => None,
        }
    }

    /// Label written into report rows.
    pub fn report_label(self) -> &'static str {
        self.row_suffix().unwrap_or("N/A")
    }
}

/// Applies the status decision table to a keyword's matched events.
///
/// A 4xx short-circuits to `Failed`. Otherwise every event must carry a
/// status in `[200, 400)` for `Pass`; anything else (5xx, 1xx, missing) makes
/// the verdict `Indeterminate`. No events at all is `Standby`.
pub fn derive_status<'a, I>(events: I) -> KeywordStatus
where
    I: IntoIterator<Item = &'a NetworkEvent>,
{
    let mut seen_any = false;
    let mut all_pass = true;
    for event in events {
        seen_any = true;
        match event.status_code {
            Some(code) if (400..500).contains(&code) => return KeywordStatus::Failed,
            Some(code) if (200..400).contains(&code) => {}
            _ => all_pass = false,
        }
    }

    if !seen_any {
        KeywordStatus::Standby
    } else if all_pass {
        KeywordStatus::Pass
    } else {
        KeywordStatus::Indeterminate
    }
}
