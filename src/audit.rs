//! Audit orchestration.
//!
//! [`run_audit`] is the main entry-point: it enumerates APIs, applies the
//! configured filters, loads the whitelist policy once and hands everything
//! to a [`ScanCoordinator`]. The coordinator scans APIs **one at a time** so
//! per-API progress and summaries never interleave; parallelism lives inside
//! each API (see [`crate::scanner`]).

use crate::config::{Config, FilterConfig};
use crate::error::ScanError;
use crate::finding::ScanResult;
use crate::gateway::ApiGateway;
use crate::model::Api;
use crate::scanner::{
    api::scan_api, filter_apis, FindingSink, NoopObserver, ScanCancellation, ScanContext,
    ScanObserver,
};
use crate::whitelist::WhitelistPolicy;

static NOOP_OBSERVER: NoopObserver = NoopObserver;

/// Runs APIs through the scanner sequentially.
pub struct ScanCoordinator<'a> {
    gateway: &'a dyn ApiGateway,
    sink: &'a dyn FindingSink,
    policy: &'a WhitelistPolicy,
    observer: &'a dyn ScanObserver,
    cancellation: ScanCancellation,
    filter: FilterConfig,
}

impl<'a> ScanCoordinator<'a> {
    /// Creates a coordinator with the default filters, no observer and a
    /// fresh cancellation flag.
    pub fn new(
        gateway: &'a dyn ApiGateway,
        sink: &'a dyn FindingSink,
        policy: &'a WhitelistPolicy,
    ) -> Self {
        ScanCoordinator {
            gateway,
            sink,
            policy,
            observer: &NOOP_OBSERVER,
            cancellation: ScanCancellation::new(),
            filter: FilterConfig::default(),
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ScanObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancellation: ScanCancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Filters `apis` by name suffix, then scans the rest in order, each
    /// with `pool_size` resource workers.
    ///
    /// One [`ScanResult`] is returned per scanned API, including failed ones.
    /// After cancellation no further API is started.
    pub fn run(&self, apis: Vec<Api>, pool_size: usize) -> Vec<ScanResult> {
        let before = apis.len();
        let apis = filter_apis(apis, &self.filter.excluded_suffixes);
        if apis.len() < before {
            tracing::info!(
                excluded = before - apis.len(),
                suffixes = ?self.filter.excluded_suffixes,
                "filtered APIs by suffix"
            );
        }

        let ctx = ScanContext {
            gateway: self.gateway,
            policy: self.policy,
            sink: self.sink,
            observer: self.observer,
            cancellation: &self.cancellation,
            excluded_methods: &self.filter.excluded_methods,
        };

        let total = apis.len();
        let mut results = Vec::with_capacity(total);
        for (index, api) in apis.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                tracing::warn!(remaining = total - index, "scan interrupted");
                break;
            }
            self.observer.on_api_start(index + 1, total, api);
            let result = scan_api(&ctx, api, pool_size);
            self.observer.on_api_finished(&result);
            results.push(result);
        }
        results
    }
}

/// Restricts `apis` to the one whose id or name equals `selector`.
pub fn select_api(apis: Vec<Api>, selector: &str) -> Vec<Api> {
    apis.into_iter()
        .filter(|api| api.id == selector || api.name == selector)
        .collect()
}

/// Runs a complete audit.
///
/// # Pipeline
///
/// 1. Lists every API through the gateway.
/// 2. Narrows to `only_api` (id or name) when given.
/// 3. Loads the whitelist policy configured in [`Config::whitelist`].
/// 4. Scans the remaining APIs sequentially via [`ScanCoordinator`], after
///    suffix filtering, streaming findings into `sink`.
///
/// # Errors
///
/// Returns [`ScanError::ListApis`] when the API inventory cannot be listed.
/// Everything below that level is absorbed into the per-API results.
pub fn run_audit(
    config: &Config,
    gateway: &dyn ApiGateway,
    sink: &dyn FindingSink,
    observer: &dyn ScanObserver,
    cancellation: ScanCancellation,
    only_api: Option<&str>,
) -> Result<Vec<ScanResult>, ScanError> {
    let mut apis = gateway.list_apis().map_err(ScanError::ListApis)?;
    tracing::info!(count = apis.len(), "found APIs");

    if let Some(selector) = only_api {
        apis = select_api(apis, selector);
    }

    let policy = WhitelistPolicy::load(&config.whitelist);

    let coordinator = ScanCoordinator::new(gateway, sink, &policy)
        .with_observer(observer)
        .with_cancellation(cancellation)
        .with_filter(config.filter.clone());

    Ok(coordinator.run(apis, config.scan.pool_size))
}
