use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::json;
use thiserror::Error;

use tagqa_core::ReportRow;

use crate::naming::timestamped_filename;
use crate::persist::{ArtifactWriter, PersistError};

const IMAGE_MISSING: &str = "Image not found";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("there are no report rows to render")]
    NoRows,
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub report_path: PathBuf,
    pub manifest_path: PathBuf,
    pub row_count: usize,
    pub missing_images: usize,
}

/// Turns ordered report rows into a document on disk.
pub trait ReportRenderer {
    fn render(&self, rows: &[ReportRow], generated_at: DateTime<Local>) -> Result<RenderedReport, ReportError>;
}

/// Markdown table with embedded capture links, plus a JSON manifest.
#[derive(Debug, Clone)]
pub struct MarkdownReportRenderer {
    writer: ArtifactWriter,
}

impl MarkdownReportRenderer {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            writer: ArtifactWriter::new(output_dir),
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.writer.dir()
    }
}

impl ReportRenderer for MarkdownReportRenderer {
    fn render(&self, rows: &[ReportRow], generated_at: DateTime<Local>) -> Result<RenderedReport, ReportError> {
        if rows.is_empty() {
            return Err(ReportError::NoRows);
        }

        let mut missing_images = 0;
        let mut doc = String::new();
        doc.push_str("# Test Report\n\n");
        doc.push_str(&format!(
            "Generated {}\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        doc.push_str("| Keyword | Language | Status | URL | Screenshot |\n");
        doc.push_str("|---|---|---|---|---|\n");
        for row in rows {
            let screenshot = if row.screenshot_path.is_file() {
                format!("![{}]({})", escape_cell(&row.keyword_text), row.screenshot_path.display())
            } else {
                missing_images += 1;
                IMAGE_MISSING.to_string()
            };
            doc.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                escape_cell(&row.keyword_text),
                row.language.code(),
                row.status.report_label(),
                escape_cell(&row.url),
                screenshot
            ));
        }

        let report_path = self
            .writer
            .store_text(&timestamped_filename("Test_Report", "md", &generated_at), &doc)?;
        let report_name = file_name(&report_path);
        let manifest_name = file_name(&report_path.with_extension("json"));

        let manifest = json!({
            "generated": generated_at.to_rfc3339(),
            "report": report_name,
            "row_count": rows.len(),
            "missing_images": missing_images,
            "rows": rows.iter().map(|row| {
                json!({
                    "keyword": row.keyword_text,
                    "language": row.language.code(),
                    "status": row.status.report_label(),
                    "url": row.url,
                    "screenshot": row.screenshot_path.display().to_string(),
                })
            }).collect::<Vec<_>>()
        });
        let manifest_path = self.writer.store_text(&manifest_name, &manifest.to_string())?;

        Ok(RenderedReport {
            report_path,
            manifest_path,
            row_count: rows.len(),
            missing_images,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
