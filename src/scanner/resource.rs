//! Analysis of a single resource.

use super::authorizer_cache::AuthorizerCache;
use super::{filter_methods, ScanContext};
use crate::finding::Finding;
use crate::model::{Api, Resource};

/// What one resource contributed to its API's result.
#[derive(Debug, Clone, Default)]
pub struct ResourceAnalysis {
    pub findings: Vec<Finding>,
    /// Methods dropped as excluded (CORS preflight by default).
    pub methods_filtered: usize,
    /// The worker died before finishing; `findings` holds what it streamed.
    pub worker_failed: bool,
}

/// Analyzes the methods of `resource` one after another.
///
/// For every kept method: resolve its authorization (a failure skips the
/// method), resolve its integration (a failure leaves the endpoint empty),
/// classify it against the whitelist and append the finding to the sink
/// straight away. A resource whose method set cannot be fetched contributes
/// nothing.
///
/// `cache` must be fully built before this is called.
pub fn analyze(
    ctx: &ScanContext<'_>,
    api: &Api,
    resource: &Resource,
    cache: &AuthorizerCache,
) -> ResourceAnalysis {
    let mut analysis = ResourceAnalysis::default();
    analyze_into(ctx, api, resource, cache, &mut analysis);
    analysis
}

/// Same as [`analyze`], recording into `out` as it goes.
///
/// Every finding is pushed to `out` right after it reaches the sink, so if
/// the worker dies halfway `out` still holds exactly what was streamed.
pub fn analyze_into(
    ctx: &ScanContext<'_>,
    api: &Api,
    resource: &Resource,
    cache: &AuthorizerCache,
    out: &mut ResourceAnalysis,
) {
    let methods = match ctx.gateway.get_resource_methods(&api.id, &resource.id) {
        Ok(methods) => methods,
        Err(e) => {
            tracing::warn!(api = %api.name, resource = %resource.path, "could not fetch methods: {e}");
            return;
        }
    };

    let (methods, methods_filtered) = filter_methods(methods, ctx.excluded_methods);
    out.methods_filtered += methods_filtered;
    out.findings.reserve(methods.len());

    for method in &methods {
        let auth = match ctx
            .gateway
            .get_method_authorization(&api.id, &resource.id, method)
        {
            Ok(auth) => cache.resolve(auth),
            Err(e) => {
                tracing::warn!(api = %api.name, resource = %resource.path, method = %method, "could not fetch authorization: {e}");
                continue;
            }
        };

        let endpoint_url = match ctx
            .gateway
            .get_integration_detail(&api.id, &resource.id, method)
        {
            Ok(integration) => integration.endpoint_path(),
            Err(e) => {
                tracing::debug!(api = %api.name, resource = %resource.path, method = %method, "no integration: {e}");
                String::new()
            }
        };

        let whitelist_source = ctx.policy.classify(&api.name, method, &resource.path);
        let finding = Finding::new(
            &api.name,
            &resource.id,
            method,
            &resource.path,
            &auth,
            endpoint_url,
            whitelist_source,
        );

        if let Err(e) = ctx.sink.append(&finding) {
            tracing::warn!(api = %api.name, path = %finding.path, method = %finding.method, "failed to record finding: {e}");
        }
        out.findings.push(finding);
    }
}
