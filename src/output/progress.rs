//! Live console progress, written to stderr.

use crate::finding::{Finding, ScanResult, ScanStatus};
use crate::model::Api;
use crate::scanner::ScanObserver;
use colored::Colorize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prints one line per API phase and, with `verbose`, one per resource.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    verbose: bool,
    resources_total: AtomicUsize,
    resources_done: AtomicUsize,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        ConsoleObserver {
            verbose,
            ..Self::default()
        }
    }
}

impl ScanObserver for ConsoleObserver {
    fn on_api_start(&self, index: usize, total: usize, api: &Api) {
        self.resources_total.store(0, Ordering::SeqCst);
        self.resources_done.store(0, Ordering::SeqCst);
        eprintln!(
            "\n{} {} {}",
            format!("[{index}/{total}]").bold(),
            "Scanning".cyan(),
            api.name.bold()
        );
    }

    fn on_resources_found(&self, _api: &Api, count: usize) {
        self.resources_total.store(count, Ordering::SeqCst);
        eprintln!("  {count} resources");
    }

    fn on_authorizers_cached(&self, _api: &Api, discovered: usize, cached: usize) {
        if discovered == 0 {
            return;
        }
        let line = format!("  {cached}/{discovered} authorizers cached");
        if cached < discovered {
            eprintln!("{}", line.yellow());
        } else {
            eprintln!("{line}");
        }
    }

    fn on_resource_analyzed(&self, path: &str, findings: &[Finding]) {
        let done = self.resources_done.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.verbose {
            return;
        }
        let total = self.resources_total.load(Ordering::SeqCst);
        let unprotected = findings.iter().filter(|f| !f.is_authorized()).count();
        let marker = if unprotected > 0 {
            format!("{unprotected} unprotected").red().to_string()
        } else {
            "ok".green().to_string()
        };
        eprintln!("  ({done}/{total}) {path} {marker}");
    }

    fn on_api_finished(&self, result: &ScanResult) {
        match result.status {
            ScanStatus::Failed => eprintln!(
                "  {} {}",
                "failed:".red().bold(),
                result.error.as_deref().unwrap_or("unknown error")
            ),
            ScanStatus::Empty => eprintln!("  {}", "no resources".dimmed()),
            ScanStatus::Interrupted => eprintln!(
                "  {} after {} of {} resources",
                "interrupted".yellow().bold(),
                self.resources_done.load(Ordering::SeqCst),
                result.total_resources
            ),
            ScanStatus::Scanned => eprintln!(
                "  {} protected, {} unprotected in {} ms",
                result.protected_count().to_string().green(),
                result.unprotected_count().to_string().red(),
                result.duration_ms
            ),
        }
    }
}
