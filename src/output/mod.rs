//! Report output.
//!
//! | Output | Module | When |
//! |--------|--------|------|
//! | Streaming CSV, one row per method | [`csv`] | while scanning |
//! | Per-API summary CSV | [`csv`] | end of run |
//! | Full JSON report | [`json`] | end of run, or `--format json` |
//! | Colored security report | [`pretty`] | end of run |
//! | Live progress | [`progress`] | while scanning |
//!
//! Report files are timestamped (`YYYYMMDD_HHMMSS`) and written to the
//! configured report directory.

pub mod csv;
pub mod json;
pub mod pretty;
pub mod progress;

use crate::error::ReportError;
use crate::finding::{RunSummary, ScanResult};
use std::path::{Path, PathBuf};

/// Supported output formats for the final report.
#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text.
    Pretty,
    /// Machine-readable JSON.
    Json,
}

/// Formats the results of a run in the requested [`OutputFormat`].
pub fn format_report(results: &[ScanResult], summary: &RunSummary, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => pretty::format(results, summary),
        OutputFormat::Json => json::format(results, summary),
    }
}

/// Timestamp used in report file names.
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Creates `dir` if needed.
pub fn ensure_report_dir(dir: &Path) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(dir.to_path_buf())
}

/// Writes a diagnostic dump for a failure that ended the run.
///
/// Returns the path of the dump.
pub fn write_error_dump(
    dir: &Path,
    message: &str,
    error: Option<&dyn std::error::Error>,
) -> Result<PathBuf, ReportError> {
    let dir = ensure_report_dir(dir)?;
    let path = dir.join(format!("error_dump_{}.log", file_timestamp()));

    let mut content = format!(
        "=== ERROR DUMP - {} ===\n\nError Message: {message}\n",
        chrono::Local::now().to_rfc3339()
    );
    if let Some(error) = error {
        content.push_str("\nError chain:\n");
        let mut current: Option<&dyn std::error::Error> = Some(error);
        while let Some(e) = current {
            content.push_str(&format!("  - {e}\n"));
            current = e.source();
        }
    }

    std::fs::write(&path, content).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
