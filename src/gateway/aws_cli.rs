//! [`ApiGateway`] backed by the [AWS CLI](https://aws.amazon.com/cli/).
//!
//! This is an **external** transport: it requires the `aws` binary on `PATH`
//! (or the configured binary path) and valid credentials.
//!
//! # How it works
//!
//! 1. Spawns `aws apigateway <operation> ... --output json`, adding
//!    `--profile` / `--region` when configured.
//! 2. A non-zero exit becomes [`GatewayError::CommandFailed`] (or
//!    [`GatewayError::NotFound`] for `NotFoundException`).
//! 3. Stdout is decoded with `serde_json` into private wire structs and
//!    converted to [`crate::model`] records.
//!
//! List operations rely on the CLI's automatic pagination.

use super::ApiGateway;
use crate::config::AwsConfig;
use crate::error::GatewayError;
use crate::model::{Api, AuthorizerDetail, IntegrationDetail, MethodAuthorization, Resource};
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashMap};
use std::process::Command;

const HEADER_PARAM_PREFIX: &str = "method.request.header.";

/// Gateway that shells out to `aws apigateway`.
#[derive(Debug, Clone)]
pub struct AwsCliGateway {
    binary: String,
    profile: Option<String>,
    region: Option<String>,
}

impl AwsCliGateway {
    pub fn new(config: &AwsConfig) -> Self {
        AwsCliGateway {
            binary: config.binary.clone(),
            profile: config.profile.clone(),
            region: config.region.clone(),
        }
    }

    /// Returns `true` if the configured binary can be found.
    pub fn is_available(&self) -> bool {
        super::which_exists(&self.binary)
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Verifies that credentials are configured by calling
    /// `sts get-caller-identity`. Returns the caller ARN.
    pub fn caller_identity(&self) -> Result<String, GatewayError> {
        let identity: CallerIdentity =
            self.run("sts", "get-caller-identity", &[])?;
        Ok(identity.arn)
    }

    fn run<T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        args: &[&str],
    ) -> Result<T, GatewayError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(service).arg(operation).args(args);
        cmd.args(["--output", "json"]);
        if let Some(profile) = &self.profile {
            cmd.args(["--profile", profile.as_str()]);
        }
        if let Some(region) = &self.region {
            cmd.args(["--region", region.as_str()]);
        }

        tracing::debug!(service, operation, ?args, "aws call");

        let output = cmd.output().map_err(|source| GatewayError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(command_error(operation, &stderr));
        }

        serde_json::from_slice(&output.stdout).map_err(|source| GatewayError::Malformed {
            operation: operation.to_string(),
            source,
        })
    }

    fn apigateway<T: DeserializeOwned>(
        &self,
        operation: &str,
        args: &[&str],
    ) -> Result<T, GatewayError> {
        self.run("apigateway", operation, args)
    }
}

/// Maps CLI stderr to a [`GatewayError`].
///
/// JSON error bodies contribute their `message`; `NotFoundException` becomes
/// [`GatewayError::NotFound`].
fn command_error(operation: &str, stderr: &str) -> GatewayError {
    let stderr = stderr.trim();
    let message = if stderr.starts_with('{') {
        serde_json::from_str::<serde_json::Value>(stderr)
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| stderr.to_string())
    } else if stderr.is_empty() {
        "unknown error".to_string()
    } else {
        stderr.to_string()
    };

    if message.contains("NotFoundException") {
        GatewayError::NotFound(operation.to_string())
    } else {
        GatewayError::CommandFailed {
            operation: operation.to_string(),
            message,
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CallerIdentity {
    arn: String,
}

#[derive(serde::Deserialize)]
struct Items<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(serde::Deserialize)]
struct WireApi {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResource {
    id: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    resource_methods: HashMap<String, serde_json::Value>,
}

impl From<WireResource> for Resource {
    fn from(w: WireResource) -> Self {
        Resource {
            id: w.id,
            path: w.path,
            method_names: w.resource_methods.into_keys().collect(),
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMethod {
    #[serde(default)]
    authorization_type: Option<String>,
    authorizer_id: Option<String>,
    #[serde(default)]
    api_key_required: bool,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAuthorizer {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    identity_source: Option<String>,
    identity_validation_expression: Option<String>,
    authorizer_uri: Option<String>,
    authorizer_credentials: Option<String>,
    authorizer_result_ttl_in_seconds: Option<u64>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIntegration {
    #[serde(default)]
    uri: String,
    #[serde(rename = "type", default)]
    kind: String,
    http_method: Option<String>,
    #[serde(default)]
    request_parameters: HashMap<String, String>,
}

impl From<WireIntegration> for IntegrationDetail {
    fn from(w: WireIntegration) -> Self {
        let headers = w
            .request_parameters
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(HEADER_PARAM_PREFIX)
                    .map(|name| (name.to_string(), value))
            })
            .collect();

        IntegrationDetail {
            uri: w.uri,
            kind: w.kind,
            http_method: w.http_method,
            headers,
        }
    }
}

impl ApiGateway for AwsCliGateway {
    fn list_apis(&self) -> Result<Vec<Api>, GatewayError> {
        let page: Items<WireApi> = self.apigateway("get-rest-apis", &[])?;
        Ok(page
            .items
            .into_iter()
            .map(|w| Api::new(w.id, w.name))
            .collect())
    }

    fn list_resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError> {
        let page: Items<WireResource> = self.apigateway(
            "get-resources",
            &["--rest-api-id", api_id, "--embed", "methods"],
        )?;
        Ok(page.items.into_iter().map(Resource::from).collect())
    }

    fn get_resource_methods(
        &self,
        api_id: &str,
        resource_id: &str,
    ) -> Result<BTreeSet<String>, GatewayError> {
        let resource: WireResource = self.apigateway(
            "get-resource",
            &["--rest-api-id", api_id, "--resource-id", resource_id],
        )?;
        Ok(resource.resource_methods.into_keys().collect())
    }

    fn get_method_authorization(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &str,
    ) -> Result<MethodAuthorization, GatewayError> {
        let wire: WireMethod = self.apigateway(
            "get-method",
            &[
                "--rest-api-id",
                api_id,
                "--resource-id",
                resource_id,
                "--http-method",
                method,
            ],
        )?;
        Ok(MethodAuthorization {
            authorization_type: wire.authorization_type.unwrap_or_default().into(),
            authorizer_id: wire.authorizer_id,
            api_key_required: wire.api_key_required,
            authorizer_detail: None,
            identity_source: None,
        })
    }

    fn get_authorizer_detail(
        &self,
        api_id: &str,
        authorizer_id: &str,
    ) -> Result<AuthorizerDetail, GatewayError> {
        let wire: WireAuthorizer = self.apigateway(
            "get-authorizer",
            &["--rest-api-id", api_id, "--authorizer-id", authorizer_id],
        )?;
        Ok(AuthorizerDetail {
            id: wire.id.unwrap_or_else(|| authorizer_id.to_string()),
            name: wire.name,
            kind: wire.kind,
            identity_source: wire.identity_source,
            validation_expression: wire.identity_validation_expression,
            uri: wire.authorizer_uri,
            credentials: wire.authorizer_credentials,
            result_ttl_seconds: wire.authorizer_result_ttl_in_seconds,
        })
    }

    fn get_integration_detail(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &str,
    ) -> Result<IntegrationDetail, GatewayError> {
        let wire: WireIntegration = self.apigateway(
            "get-integration",
            &[
                "--rest-api-id",
                api_id,
                "--resource-id",
                resource_id,
                "--http-method",
                method,
            ],
        )?;
        Ok(wire.into())
    }
}
