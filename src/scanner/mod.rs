//! The concurrent scanning engine.
//!
//! Work for one API runs in three bounded tiers, each drained before the next
//! starts:
//!
//! 1. **Discovery**: collect the distinct authorizer ids referenced by the
//!    API's methods ([`authorizer_cache`]).
//! 2. **Population**: fetch each of those authorizers once, with half the
//!    workers of tier 1.
//! 3. **Analysis**: analyze resources in parallel ([`resource`]), methods of
//!    a resource sequentially.
//!
//! [`api::scan_api`] drives the tiers for one API. APIs themselves are never
//! scanned concurrently; see [`crate::audit`].
//!
//! Findings reach the [`FindingSink`] in completion order, which is **not**
//! deterministic across runs.

pub mod api;
pub mod authorizer_cache;
pub mod resource;

use crate::error::ReportError;
use crate::finding::{Finding, ScanResult};
use crate::gateway::ApiGateway;
use crate::model::Api;
use crate::whitelist::WhitelistPolicy;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Everything a worker needs, shared by reference across all tiers.
#[derive(Clone, Copy)]
pub struct ScanContext<'a> {
    pub gateway: &'a dyn ApiGateway,
    pub policy: &'a WhitelistPolicy,
    pub sink: &'a dyn FindingSink,
    pub observer: &'a dyn ScanObserver,
    pub cancellation: &'a ScanCancellation,
    pub excluded_methods: &'a [String],
}

impl ScanContext<'_> {
    pub fn is_method_excluded(&self, method: &str) -> bool {
        is_method_excluded(method, self.excluded_methods)
    }
}

/// Receives every finding as soon as it is produced.
///
/// Called concurrently from resource workers; each `append` must be atomic.
pub trait FindingSink: Send + Sync {
    fn append(&self, finding: &Finding) -> Result<(), ReportError>;
}

/// In-memory sink.
impl FindingSink for Mutex<Vec<Finding>> {
    fn append(&self, finding: &Finding) -> Result<(), ReportError> {
        self.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(finding.clone());
        Ok(())
    }
}

/// Progress callbacks.
///
/// All methods default to no-ops. `on_resource_analyzed` is called from
/// worker threads; the others from the coordinating thread.
pub trait ScanObserver: Send + Sync {
    fn on_api_start(&self, _index: usize, _total: usize, _api: &Api) {}

    fn on_resources_found(&self, _api: &Api, _count: usize) {}

    fn on_authorizers_cached(&self, _api: &Api, _discovered: usize, _cached: usize) {}

    fn on_resource_analyzed(&self, _path: &str, _findings: &[Finding]) {}

    fn on_api_finished(&self, _result: &ScanResult) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Shared interrupt flag.
///
/// Once cancelled, no new API, resource or authorizer task is started; tasks
/// already running complete normally.
#[derive(Debug, Clone, Default)]
pub struct ScanCancellation {
    flag: Arc<AtomicBool>,
}

impl ScanCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Returns `true` if `name` ends with one of `excluded_suffixes`.
pub fn is_api_excluded(name: &str, excluded_suffixes: &[String]) -> bool {
    excluded_suffixes
        .iter()
        .any(|suffix| name.ends_with(suffix.as_str()))
}

/// Returns `true` if `method` is in `excluded_methods`, ignoring case.
///
/// ```
/// use api_guardian::scanner::is_method_excluded;
///
/// let excluded = vec!["OPTIONS".to_string()];
/// assert!(is_method_excluded("options", &excluded));
/// assert!(!is_method_excluded("GET", &excluded));
/// ```
pub fn is_method_excluded(method: &str, excluded_methods: &[String]) -> bool {
    excluded_methods
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method))
}

/// Drops APIs whose name ends with one of `excluded_suffixes`, keeping order.
///
/// ```
/// use api_guardian::model::Api;
/// use api_guardian::scanner::filter_apis;
///
/// let apis = vec![Api::new("1", "payments-DEV"), Api::new("2", "payments")];
/// let kept = filter_apis(apis, &["-DEV".to_string()]);
/// assert_eq!(kept, vec![Api::new("2", "payments")]);
/// ```
pub fn filter_apis(apis: Vec<Api>, excluded_suffixes: &[String]) -> Vec<Api> {
    apis.into_iter()
        .filter(|api| !is_api_excluded(&api.name, excluded_suffixes))
        .collect()
}

/// Removes excluded methods and returns the kept set with the number removed.
pub fn filter_methods(
    methods: BTreeSet<String>,
    excluded_methods: &[String],
) -> (BTreeSet<String>, usize) {
    let before = methods.len();
    let kept: BTreeSet<String> = methods
        .into_iter()
        .filter(|m| !is_method_excluded(m, excluded_methods))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Runs one worker task, turning a panic into `None` so sibling tasks and
/// the pool keep going.
pub(crate) fn isolate<T>(task: &str, f: impl FnOnce() -> T) -> Option<T> {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(task, "worker failed: {message}");
            None
        }
    }
}

/// Builds a named rayon pool with `threads` workers.
pub(crate) fn build_pool(
    name: &'static str,
    threads: usize,
) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(move |i| format!("{name}-{i}"))
        .build()
}
