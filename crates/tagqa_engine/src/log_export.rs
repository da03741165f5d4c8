use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;

use tagqa_core::NetworkEvent;

use crate::naming::timestamped_filename;
use crate::persist::{ArtifactWriter, PersistError};

const HEADER: [&str; 7] = ["Name", "Status", "Method", "Type", "Size", "Time", "URL Hash"];
const MISSING: &str = "N/A";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("there is no log data to export")]
    EmptyLog,
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Renders events as CSV, one row per event, times in the given zone.
pub fn render_csv<Tz>(events: &[NetworkEvent], zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    push_record(&mut out, HEADER.iter().map(|h| h.to_string()));
    for event in events {
        let local: DateTime<Tz> = event.captured_at.with_timezone(zone);
        push_record(
            &mut out,
            [
                event.resource_name.clone(),
                event
                    .status_code
                    .map_or_else(|| MISSING.to_string(), |code| code.to_string()),
                event.method.clone(),
                event.resource_type.clone(),
                event
                    .size_bytes
                    .map_or_else(|| MISSING.to_string(), |size| size.to_string()),
                local.format("%H:%M:%S %d/%m/%Y").to_string(),
                event.context_hash.clone(),
            ],
        );
    }
    out
}

/// Writes `network_log_<timestamp>.csv` into `dir`.
pub fn export_log(dir: &Path, events: &[NetworkEvent]) -> Result<PathBuf, ExportError> {
    if events.is_empty() {
        return Err(ExportError::EmptyLog);
    }
    let now = Local::now();
    let csv = render_csv(events, &Local);
    let filename = timestamped_filename("network_log", "csv", &now);
    Ok(ArtifactWriter::new(dir.to_path_buf()).store_text(&filename, &csv)?)
}

fn push_record(out: &mut String, fields: impl IntoIterator<Item = String>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote_field(&field));
    }
    out.push_str("\r\n");
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
