//! Scanning one API end to end.
//!
//! ```text
//! Fetching ──► Empty                      (no resources)
//!          ──► Failed                     (resource list unavailable)
//!          ──► Scanning ──► Summarized    (cache build, then resource pool)
//! ```

use super::authorizer_cache::AuthorizerCache;
use super::resource::{self, ResourceAnalysis};
use super::{build_pool, isolate, ScanContext};
use crate::finding::{ScanResult, ScanStatus};
use crate::model::Api;
use rayon::prelude::*;
use std::time::Instant;

/// Scans every resource of `api` with up to `pool_size` workers.
///
/// Never fails: a missing resource list produces a [`ScanStatus::Failed`]
/// result carrying the error, and every lower-level failure only removes
/// data from the result. A resource worker that panics keeps the findings it
/// already streamed and is counted in [`ScanResult::worker_failures`].
pub fn scan_api(ctx: &ScanContext<'_>, api: &Api, pool_size: usize) -> ScanResult {
    let start = Instant::now();

    let resources = match ctx.gateway.list_resources(&api.id) {
        Ok(resources) => resources,
        Err(e) => {
            tracing::warn!(api = %api.name, api_id = %api.id, "could not retrieve resources: {e}");
            return failed(api, start, format!("failed to retrieve resources: {e}"));
        }
    };

    if resources.is_empty() {
        return ScanResult {
            duration_ms: start.elapsed().as_millis() as u64,
            ..ScanResult::empty(api)
        };
    }

    ctx.observer.on_resources_found(api, resources.len());

    // Both cache phases drain here, before any resource worker starts.
    let cache = match AuthorizerCache::build(ctx, api, &resources, pool_size) {
        Ok(cache) => cache,
        Err(e) => return failed(api, start, format!("failed to build worker pool: {e}")),
    };

    let pool = match build_pool("resource", pool_size) {
        Ok(pool) => pool,
        Err(e) => return failed(api, start, format!("failed to build worker pool: {e}")),
    };

    // `None` marks a resource never started because the scan was interrupted.
    let analyses: Vec<Option<ResourceAnalysis>> = pool.install(|| {
        resources
            .par_iter()
            .map(|res| {
                if ctx.cancellation.is_cancelled() {
                    return None;
                }
                let mut analysis = ResourceAnalysis::default();
                let finished = isolate("resource", || {
                    resource::analyze_into(ctx, api, res, &cache, &mut analysis)
                });
                analysis.worker_failed = finished.is_none();
                ctx.observer.on_resource_analyzed(&res.path, &analysis.findings);
                Some(analysis)
            })
            .collect()
    });

    let interrupted = analyses.iter().any(Option::is_none);
    let mut result = ScanResult {
        status: if interrupted {
            ScanStatus::Interrupted
        } else {
            ScanStatus::Scanned
        },
        total_resources: resources.len(),
        ..ScanResult::empty(api)
    };

    for analysis in analyses.into_iter().flatten() {
        result.methods_filtered += analysis.methods_filtered;
        if analysis.worker_failed {
            result.worker_failures += 1;
        }
        if analysis.findings.is_empty() {
            continue;
        }
        result.resources_scanned += 1;
        for finding in analysis.findings {
            if finding.is_authorized() {
                result.findings_authorized.push(finding);
            } else {
                result.findings_unauthorized.push(finding);
            }
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}

fn failed(api: &Api, start: Instant, error: String) -> ScanResult {
    ScanResult {
        duration_ms: start.elapsed().as_millis() as u64,
        ..ScanResult::failed(api, error)
    }
}
