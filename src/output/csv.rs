//! CSV reports.
//!
//! [`CsvReport`] is the streaming per-method report. It is created with its
//! header row before scanning starts; every [`Finding`] is then appended as
//! one row by opening the file, writing the row and closing it again, so a
//! run that is killed midway still leaves a valid report behind.

use crate::error::ReportError;
use crate::finding::{Finding, ScanResult};
use crate::scanner::FindingSink;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Columns of the per-method report.
pub const REPORT_COLUMNS: [&str; 9] = [
    "api",
    "method",
    "path",
    "is_authorized",
    "authorization_type",
    "authorizer_name",
    "api_key",
    "whitelist",
    "endpoint_url",
];

/// Columns of the per-API summary.
pub const SUMMARY_COLUMNS: [&str; 5] = [
    "api_name",
    "total_endpoints",
    "protected_endpoints",
    "unprotected_endpoints",
    "security_status",
];

/// Append-only CSV report shared by all resource workers.
#[derive(Debug)]
pub struct CsvReport {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvReport {
    /// Creates `<dir>/<API_NAME>_report_<ts>.csv` when scanning a single
    /// API, otherwise `<dir>/security_audit_report_<ts>.csv`.
    pub fn create_in(dir: &Path, api_name: Option<&str>) -> Result<Self, ReportError> {
        let dir = super::ensure_report_dir(dir)?;
        let ts = super::file_timestamp();
        let file_name = match api_name {
            Some(name) => format!("{}_report_{ts}.csv", name.replace([' ', '/'], "_")),
            None => format!("security_audit_report_{ts}.csv"),
        };
        Self::create(&dir.join(file_name))
    }

    /// Creates (or truncates) `path` and writes the header row.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        std::fs::write(path, format!("{}\n", REPORT_COLUMNS.join(","))).map_err(|source| {
            ReportError::Write {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(CsvReport {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FindingSink for CsvReport {
    fn append(&self, finding: &Finding) -> Result<(), ReportError> {
        let line = format!("{}\n", finding_row(finding).join(","));
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        std::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| ReportError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Renders one finding as escaped CSV fields in [`REPORT_COLUMNS`] order.
pub fn finding_row(finding: &Finding) -> Vec<String> {
    vec![
        csv_escape(&finding.api_name),
        csv_escape(&finding.method),
        csv_escape(&finding.path),
        yes_no(finding.is_authorized()).to_string(),
        csv_escape(finding.authorization_type.as_str()),
        csv_escape(or_none(&finding.authorizer_name)),
        yes_no(finding.api_key_required).to_string(),
        csv_escape(&finding.whitelist_source),
        csv_escape(&finding.endpoint_url),
    ]
}

/// Security status label of one API in the summary report.
pub fn security_status(result: &ScanResult) -> &'static str {
    if result.total_methods() == 0 {
        "No endpoints"
    } else if result.unprotected_count() == 0 {
        "Secure"
    } else {
        "At Risk"
    }
}

/// Renders the per-API summary. Failed APIs are left out.
pub fn format_summary(results: &[ScanResult]) -> String {
    let mut out = format!("{}\n", SUMMARY_COLUMNS.join(","));
    for result in results.iter().filter(|r| !r.is_failed()) {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(&result.api.name),
            result.total_methods(),
            result.protected_count(),
            result.unprotected_count(),
            security_status(result),
        ));
    }
    out
}

/// Writes `<dir>/api_summary_<ts>.csv` and returns its path.
pub fn write_summary(dir: &Path, results: &[ScanResult]) -> Result<PathBuf, ReportError> {
    let dir = super::ensure_report_dir(dir)?;
    let path = dir.join(format!("api_summary_{}.csv", super::file_timestamp()));
    std::fs::write(&path, format_summary(results)).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "NONE"
    } else {
        value
    }
}

/// Quotes a field when it contains a delimiter, quote or line break.
///
/// ```
/// use api_guardian::output::csv::csv_escape;
///
/// assert_eq!(csv_escape("plain"), "plain");
/// assert_eq!(csv_escape("a,b"), "\"a,b\"");
/// assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
/// ```
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
