//! Records fetched from the remote API inventory.
//!
//! Everything here is owned by the scan of the single API that produced it and
//! is dropped once that API's [`ScanResult`](crate::finding::ScanResult) is
//! final.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A REST API, the unit the coordinator scans one at a time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Api {
    pub id: String,
    pub name: String,
}

impl Api {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Api {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A path node of an API together with the HTTP methods it declares.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resource {
    pub id: String,
    pub path: String,
    pub method_names: BTreeSet<String>,
}

/// How a method is protected, as reported by the provider.
///
/// Unknown provider values are kept verbatim in [`AuthorizationType::Other`]
/// so they still show up in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthorizationType {
    None,
    AwsIam,
    Custom,
    CognitoUserPools,
    Other(String),
}

impl AuthorizationType {
    pub fn as_str(&self) -> &str {
        match self {
            AuthorizationType::None => "NONE",
            AuthorizationType::AwsIam => "AWS_IAM",
            AuthorizationType::Custom => "CUSTOM",
            AuthorizationType::CognitoUserPools => "COGNITO_USER_POOLS",
            AuthorizationType::Other(s) => s,
        }
    }

    /// Returns `true` for the types that count as real access control.
    ///
    /// An API key alone is not authentication, so `NONE` stays unprotected
    /// whatever `apiKeyRequired` says.
    pub fn is_proper(&self) -> bool {
        matches!(
            self,
            AuthorizationType::Custom
                | AuthorizationType::AwsIam
                | AuthorizationType::CognitoUserPools
        )
    }

    /// Returns `true` for the types backed by an authorizer record.
    pub fn is_claims_bearing(&self) -> bool {
        matches!(
            self,
            AuthorizationType::Custom | AuthorizationType::CognitoUserPools
        )
    }
}

impl From<String> for AuthorizationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "NONE" => AuthorizationType::None,
            "AWS_IAM" => AuthorizationType::AwsIam,
            "CUSTOM" => AuthorizationType::Custom,
            "COGNITO_USER_POOLS" => AuthorizationType::CognitoUserPools,
            _ => AuthorizationType::Other(value),
        }
    }
}

impl From<&str> for AuthorizationType {
    fn from(value: &str) -> Self {
        AuthorizationType::from(value.to_string())
    }
}

impl From<AuthorizationType> for String {
    fn from(value: AuthorizationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AuthorizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization settings of one resource method.
///
/// The gateway fills the raw fields; `authorizer_detail` and
/// `identity_source` are attached from the
/// [`AuthorizerCache`](crate::scanner::authorizer_cache::AuthorizerCache).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MethodAuthorization {
    pub authorization_type: AuthorizationType,
    pub authorizer_id: Option<String>,
    pub api_key_required: bool,
    pub authorizer_detail: Option<AuthorizerDetail>,
    pub identity_source: Option<String>,
}

impl MethodAuthorization {
    /// The authorizer id worth looking up, if this method references one
    /// through a claims-bearing type.
    pub fn claims_authorizer_id(&self) -> Option<&str> {
        if self.authorization_type.is_claims_bearing() {
            self.authorizer_id.as_deref()
        } else {
            None
        }
    }
}

/// An authorizer shared by every method that references its id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuthorizerDetail {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub identity_source: Option<String>,
    pub validation_expression: Option<String>,
    pub uri: Option<String>,
    pub credentials: Option<String>,
    pub result_ttl_seconds: Option<u64>,
}

/// Backend integration of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IntegrationDetail {
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub http_method: Option<String>,
    pub headers: HashMap<String, String>,
}

impl IntegrationDetail {
    /// The integration target reduced to its path, see [`clean_endpoint_url`].
    pub fn endpoint_path(&self) -> String {
        clean_endpoint_url(&self.uri)
    }
}

/// Strips scheme, host and any stage-variable placeholder from an
/// integration URI, keeping the leading-slash path.
///
/// Empty input and input that is already a path are returned unchanged. A
/// URI with a host but no path yields an empty string.
///
/// # Examples
///
/// ```
/// use api_guardian::model::clean_endpoint_url;
///
/// assert_eq!(clean_endpoint_url("https://${stageVariables.host}/a/b"), "/a/b");
/// assert_eq!(clean_endpoint_url("/already/a/path"), "/already/a/path");
/// assert_eq!(clean_endpoint_url(""), "");
/// ```
pub fn clean_endpoint_url(url: &str) -> String {
    if url.is_empty() || url.starts_with('/') {
        return url.to_string();
    }

    match url.split_once("://") {
        Some((_, rest)) => match rest.split_once('/') {
            Some((_, path)) => format!("/{path}"),
            None => String::new(),
        },
        None => String::new(),
    }
}
