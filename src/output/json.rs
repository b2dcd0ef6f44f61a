//! JSON output formatter.
//!
//! The same document is printed for `--format json` and written to
//! `security_report_<ts>.json` at the end of every run.

use crate::error::ReportError;
use crate::finding::{RunSummary, ScanResult};
use std::path::{Path, PathBuf};

#[derive(serde::Serialize)]
struct JsonOutput<'a> {
    generated_at: String,
    summary: &'a RunSummary,
    success_rate: f64,
    apis: &'a [ScanResult],
}

/// Serializes the run as pretty-printed JSON.
pub fn to_json(results: &[ScanResult], summary: &RunSummary) -> Result<String, serde_json::Error> {
    let output = JsonOutput {
        generated_at: chrono::Local::now().to_rfc3339(),
        summary,
        success_rate: summary.success_rate(),
        apis: results,
    };
    serde_json::to_string_pretty(&output)
}

/// Formats the run as JSON for the terminal.
///
/// A serialization failure is rendered as a JSON object carrying the error.
pub fn format(results: &[ScanResult], summary: &RunSummary) -> String {
    to_json(results, summary).unwrap_or_else(|e| {
        serde_json::json!({ "error": format!("JSON serialization failed: {e}") }).to_string()
    })
}

/// Writes `<dir>/security_report_<ts>.json` and returns its path.
pub fn write_report(
    dir: &Path,
    results: &[ScanResult],
    summary: &RunSummary,
) -> Result<PathBuf, ReportError> {
    let dir = super::ensure_report_dir(dir)?;
    let path = dir.join(format!("security_report_{}.json", super::file_timestamp()));
    let content = to_json(results, summary)?;
    std::fs::write(&path, content).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
