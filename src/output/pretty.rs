//! Human-readable colored text formatter.
//!
//! Renders one block per API (status, unprotected endpoints with their
//! authorization and whitelist category, then a sample of protected ones)
//! followed by the run-wide execution summary.

use crate::finding::{Finding, RunSummary, ScanResult, ScanStatus};
use colored::Colorize;

/// Number of protected endpoints listed per API.
pub const PROTECTED_SAMPLE: usize = 5;

/// Formats scan results as ANSI-colored text.
pub fn format(results: &[ScanResult], summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        "  API Gateway Security Report  ".bold().on_blue().white()
    ));
    out.push_str(&format!(
        "  Generated: {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    for result in results {
        out.push_str(&format_api(result));
    }

    out.push_str(&format_summary(summary));
    out
}

/// Formats the block for a single API.
pub fn format_api(result: &ScanResult) -> String {
    let mut out = String::new();

    let status = match result.status {
        ScanStatus::Failed => "FAIL".red().bold().to_string(),
        ScanStatus::Interrupted => "STOP".yellow().bold().to_string(),
        ScanStatus::Empty => "EMPTY".dimmed().to_string(),
        ScanStatus::Scanned if result.unprotected_count() == 0 => "SECURE".green().bold().to_string(),
        ScanStatus::Scanned => "RISK".red().bold().to_string(),
    };
    out.push_str(&format!(
        "[{status}] {} ({})\n",
        result.api.name.bold(),
        result.api.id.dimmed()
    ));

    if let Some(ref error) = result.error {
        out.push_str(&format!("  {}\n\n", error.red()));
        return out;
    }

    out.push_str(&format!(
        "  {} resources, {} methods: {} protected, {} unprotected, {} filtered ({} ms)\n",
        result.total_resources,
        result.total_methods(),
        result.protected_count().to_string().green(),
        result.unprotected_count().to_string().red(),
        result.methods_filtered,
        result.duration_ms,
    ));
    if result.worker_failures > 0 {
        out.push_str(&format!(
            "  {}\n",
            format!("{} resource worker(s) failed; their results are incomplete", result.worker_failures)
                .yellow()
        ));
    }

    if !result.findings_unauthorized.is_empty() {
        out.push_str(&format!("  {}\n", "Unprotected endpoints".bold().underline()));
        for finding in sorted(&result.findings_unauthorized) {
            let whitelist = if finding.is_whitelisted() {
                finding.whitelist_source.cyan().to_string()
            } else {
                finding.whitelist_source.red().bold().to_string()
            };
            let api_key = if finding.api_key_required {
                " +api-key".yellow().to_string()
            } else {
                String::new()
            };
            out.push_str(&format!(
                "    {:<7} {:<40} {}{} whitelist={}\n",
                finding.method,
                finding.path,
                finding.authorization_type.as_str().dimmed(),
                api_key,
                whitelist,
            ));
        }
    }

    if !result.findings_authorized.is_empty() {
        out.push_str(&format!("  {}\n", "Protected endpoints".bold().underline()));
        let protected = sorted(&result.findings_authorized);
        for finding in protected.iter().take(PROTECTED_SAMPLE) {
            let authorizer = if finding.authorizer_name.is_empty() {
                String::new()
            } else {
                format!(" ({})", finding.authorizer_name)
            };
            out.push_str(&format!(
                "    {:<7} {:<40} {}{}\n",
                finding.method,
                finding.path,
                finding.specific_auth_type.green(),
                authorizer.dimmed(),
            ));
        }
        if protected.len() > PROTECTED_SAMPLE {
            out.push_str(&format!(
                "    {}\n",
                format!("... and {} more", protected.len() - PROTECTED_SAMPLE).dimmed()
            ));
        }
    }

    out.push('\n');
    out
}

/// Formats the run-wide totals.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = format!("{}\n", "Execution Summary".bold().underline());
    out.push_str(&format!("  APIs processed:        {}\n", summary.total_apis));
    out.push_str(&format!(
        "  Succeeded / failed:    {} / {}\n",
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red()
    ));
    out.push_str(&format!("  Success rate:          {:.1}%\n", summary.success_rate()));
    out.push_str(&format!(
        "  Protected endpoints:   {}\n",
        summary.total_protected.to_string().green()
    ));
    out.push_str(&format!(
        "  Unprotected endpoints: {} ({} not whitelisted)\n",
        summary.total_unprotected.to_string().red(),
        summary.unexpected_unprotected
    ));
    out.push_str(&format!(
        "  Methods filtered:      {}\n",
        summary.total_methods_filtered
    ));
    if summary.worker_failures > 0 {
        out.push_str(&format!(
            "  Worker failures:       {}\n",
            summary.worker_failures.to_string().yellow()
        ));
    }

    let result = if summary.interrupted {
        "INTERRUPTED".yellow().bold().to_string()
    } else if summary.unexpected_unprotected > 0 {
        "AT RISK".red().bold().to_string()
    } else {
        "OK".green().bold().to_string()
    };
    out.push_str(&format!("Result: {result}\n"));
    out
}

fn sorted(findings: &[Finding]) -> Vec<&Finding> {
    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.cmp(&b.method)));
    sorted
}
