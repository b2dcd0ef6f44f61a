//! Access to the remote API inventory.
//!
//! The scanner only talks to the [`ApiGateway`] trait. The built-in
//! implementation, [`aws_cli::AwsCliGateway`], drives the `aws` command-line
//! tool; tests substitute an in-memory gateway.

pub mod aws_cli;

use crate::error::GatewayError;
use crate::model::{Api, AuthorizerDetail, IntegrationDetail, MethodAuthorization, Resource};
use std::collections::BTreeSet;

/// The remote operations the scanner needs.
///
/// Implementers **must** be [`Send`] + [`Sync`]: every method is called
/// concurrently from the worker pools. Calls are synchronous and are never
/// retried by the scanner; a failure degrades the affected unit of work.
pub trait ApiGateway: Send + Sync {
    /// Lists every REST API visible to the caller.
    fn list_apis(&self) -> Result<Vec<Api>, GatewayError>;

    /// Lists the resources of an API, including their declared methods.
    fn list_resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError>;

    /// Fetches the current method set of one resource.
    fn get_resource_methods(
        &self,
        api_id: &str,
        resource_id: &str,
    ) -> Result<BTreeSet<String>, GatewayError>;

    /// Fetches the raw authorization settings of a method. The returned value
    /// has no authorizer detail attached.
    fn get_method_authorization(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &str,
    ) -> Result<MethodAuthorization, GatewayError>;

    fn get_authorizer_detail(
        &self,
        api_id: &str,
        authorizer_id: &str,
    ) -> Result<AuthorizerDetail, GatewayError>;

    fn get_integration_detail(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &str,
    ) -> Result<IntegrationDetail, GatewayError>;
}

/// Returns `true` if an executable named `cmd` exists on `PATH`.
///
/// A `cmd` containing a path separator is checked directly. On Unix the file
/// must also have an executable permission bit set.
pub fn which_exists(cmd: &str) -> bool {
    let direct = std::path::Path::new(cmd);
    if direct.components().count() > 1 {
        return is_executable(direct);
    }

    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|dir| is_executable(&dir.join(cmd))))
        .unwrap_or(false)
}

fn is_executable(candidate: &std::path::Path) -> bool {
    if !candidate.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(candidate)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}
