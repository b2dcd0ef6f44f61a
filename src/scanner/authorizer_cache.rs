//! Per-API authorizer cache.
//!
//! Many methods share one authorizer. Looking the authorizer up from every
//! method worker would fetch the same record repeatedly and race on the
//! cache, so the cache is filled in two phases before any method is analyzed:
//!
//! 1. [`discover_authorizer_ids`] asks every resource, in parallel, which
//!    authorizers its methods reference. Results are merged by set union.
//! 2. [`AuthorizerCache::populate`] fetches each distinct id exactly once,
//!    in parallel, and collects the successes into an immutable map.
//!
//! Both phases drain fully before [`AuthorizerCache::build`] returns, so
//! readers never see a partially populated cache and need no lock.

use super::{build_pool, isolate, ScanContext};
use crate::model::{Api, AuthorizerDetail, MethodAuthorization, Resource};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Workers used for population, given the discovery pool size.
///
/// ```
/// use api_guardian::scanner::authorizer_cache::population_pool_size;
///
/// assert_eq!(population_pool_size(10), 5);
/// assert_eq!(population_pool_size(1), 1);
/// ```
pub fn population_pool_size(discovery_pool_size: usize) -> usize {
    (discovery_pool_size / 2).max(1)
}

/// Authorizer details of one API, keyed by authorizer id.
///
/// An id whose fetch failed is simply absent; callers treat a miss as "no
/// detail available".
#[derive(Debug, Clone, Default)]
pub struct AuthorizerCache {
    entries: HashMap<String, AuthorizerDetail>,
}

impl AuthorizerCache {
    /// Runs both phases for `api` and returns the finished cache.
    ///
    /// `pool_size` sizes the discovery pool; population uses
    /// [`population_pool_size`]. Reports the discovered and cached counts
    /// through [`ScanObserver::on_authorizers_cached`](super::ScanObserver::on_authorizers_cached).
    ///
    /// # Errors
    ///
    /// Only fails if a worker pool cannot be created. Remote failures are
    /// logged and absorbed.
    pub fn build(
        ctx: &ScanContext<'_>,
        api: &Api,
        resources: &[Resource],
        pool_size: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let ids = discover_authorizer_ids(ctx, &api.id, resources, pool_size)?;
        let cache = Self::populate(ctx, &api.id, &ids, population_pool_size(pool_size))?;
        ctx.observer.on_authorizers_cached(api, ids.len(), cache.len());
        Ok(cache)
    }

    /// Fetches every id once with `pool_size` workers.
    pub fn populate(
        ctx: &ScanContext<'_>,
        api_id: &str,
        ids: &BTreeSet<String>,
        pool_size: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        if ids.is_empty() {
            return Ok(Self::default());
        }

        let pool = build_pool("authorizer-fetch", pool_size)?;
        let entries: HashMap<String, AuthorizerDetail> = pool.install(|| {
            ids.par_iter()
                .filter_map(|id| {
                    if ctx.cancellation.is_cancelled() {
                        return None;
                    }
                    match isolate("authorizer-fetch", || {
                        ctx.gateway.get_authorizer_detail(api_id, id)
                    })? {
                        Ok(detail) => Some((id.clone(), detail)),
                        Err(e) => {
                            tracing::warn!(api_id, authorizer_id = %id, "authorizer unavailable: {e}");
                            None
                        }
                    }
                })
                .collect()
        });

        tracing::debug!(api_id, requested = ids.len(), cached = entries.len(), "authorizer cache built");
        Ok(AuthorizerCache { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = AuthorizerDetail>) -> Self {
        AuthorizerCache {
            entries: entries.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    pub fn get(&self, authorizer_id: &str) -> Option<&AuthorizerDetail> {
        self.entries.get(authorizer_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attaches the cached authorizer detail and its identity source to a
    /// raw method authorization. Methods whose type carries no authorizer,
    /// or whose authorizer is not cached, are returned unchanged.
    pub fn resolve(&self, mut auth: MethodAuthorization) -> MethodAuthorization {
        let detail = auth
            .claims_authorizer_id()
            .and_then(|id| self.get(id))
            .cloned();
        if let Some(detail) = detail {
            auth.identity_source = detail.identity_source.clone();
            auth.authorizer_detail = Some(detail);
        }
        auth
    }
}

/// Phase 1: the distinct claims-bearing authorizer ids used by `resources`.
///
/// Excluded methods are not inspected. Methods whose authorization cannot be
/// fetched are skipped.
pub fn discover_authorizer_ids(
    ctx: &ScanContext<'_>,
    api_id: &str,
    resources: &[Resource],
    pool_size: usize,
) -> Result<BTreeSet<String>, rayon::ThreadPoolBuildError> {
    let pool = build_pool("authorizer-discovery", pool_size)?;

    Ok(pool.install(|| {
        resources
            .par_iter()
            .map(|resource| {
                if ctx.cancellation.is_cancelled() {
                    return BTreeSet::new();
                }
                isolate("authorizer-discovery", || {
                    authorizer_ids_of(ctx, api_id, resource)
                })
                .unwrap_or_default()
            })
            .reduce(BTreeSet::new, |mut acc, ids| {
                acc.extend(ids);
                acc
            })
    }))
}

fn authorizer_ids_of(ctx: &ScanContext<'_>, api_id: &str, resource: &Resource) -> BTreeSet<String> {
    resource
        .method_names
        .iter()
        .filter(|m| !ctx.is_method_excluded(m))
        .filter_map(|method| {
            match ctx
                .gateway
                .get_method_authorization(api_id, &resource.id, method)
            {
                Ok(auth) => auth.claims_authorizer_id().map(str::to_string),
                Err(e) => {
                    tracing::debug!(api_id, resource = %resource.path, method = %method, "skipping method during discovery: {e}");
                    None
                }
            }
        })
        .collect()
}
