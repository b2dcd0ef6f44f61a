use crate::model::{Api, AuthorizationType, MethodAuthorization};
use std::fmt;

/// One analyzed `(method, path)` of an API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Finding {
    pub api_name: String,
    pub resource_id: String,
    pub method: String,
    pub path: String,
    pub authorization_type: AuthorizationType,
    pub specific_auth_type: String,
    pub authorizer_id: Option<String>,
    /// Empty when the method has no authorizer or its detail was unavailable.
    pub authorizer_name: String,
    pub api_key_required: bool,
    pub identity_source: Option<String>,
    /// Integration target reduced to a path; empty when unavailable.
    pub endpoint_url: String,
    /// `+`-joined whitelist categories, or `"NO"`.
    pub whitelist_source: String,
}

impl Finding {
    /// Builds a finding from a resolved authorization.
    pub fn new(
        api_name: &str,
        resource_id: &str,
        method: &str,
        path: &str,
        auth: &MethodAuthorization,
        endpoint_url: String,
        whitelist_source: String,
    ) -> Self {
        let authorizer_name = auth
            .authorizer_detail
            .as_ref()
            .map(|d| d.name.clone())
            .unwrap_or_default();

        Finding {
            api_name: api_name.to_string(),
            resource_id: resource_id.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            specific_auth_type: specific_auth_type(&auth.authorization_type, &authorizer_name),
            authorization_type: auth.authorization_type.clone(),
            authorizer_id: auth.authorizer_id.clone(),
            authorizer_name,
            api_key_required: auth.api_key_required,
            identity_source: auth.identity_source.clone(),
            endpoint_url,
            whitelist_source,
        }
    }

    /// Whether the endpoint has real access control. API key alone does not count.
    pub fn is_authorized(&self) -> bool {
        self.authorization_type.is_proper()
    }

    pub fn is_whitelisted(&self) -> bool {
        self.whitelist_source != crate::whitelist::NOT_WHITELISTED
    }
}

/// Narrows the authorization type using the authorizer's name.
///
/// A name containing "admin" (any case) gives `ADMIN`, one containing
/// "customer" gives `CUSTOMER`; anything else keeps the authorization type.
///
/// ```
/// use api_guardian::finding::specific_auth_type;
/// use api_guardian::model::AuthorizationType;
///
/// assert_eq!(specific_auth_type(&AuthorizationType::Custom, "BackofficeAdminAuth"), "ADMIN");
/// assert_eq!(specific_auth_type(&AuthorizationType::Custom, "jwt"), "CUSTOM");
/// ```
pub fn specific_auth_type(authorization_type: &AuthorizationType, authorizer_name: &str) -> String {
    let lower = authorizer_name.to_lowercase();
    if lower.contains("admin") {
        "ADMIN".to_string()
    } else if lower.contains("customer") {
        "CUSTOMER".to_string()
    } else {
        authorization_type.to_string()
    }
}

/// Terminal state of one API scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Resources were analyzed.
    Scanned,
    /// The API has no resources.
    Empty,
    /// The resource list could not be retrieved.
    Failed,
    /// Interrupted before every resource was analyzed.
    Interrupted,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::Scanned => write!(f, "scanned"),
            ScanStatus::Empty => write!(f, "empty"),
            ScanStatus::Failed => write!(f, "failed"),
            ScanStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Outcome of scanning one API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanResult {
    pub api: Api,
    pub status: ScanStatus,
    pub total_resources: usize,
    /// Resources that contributed at least one finding.
    pub resources_scanned: usize,
    pub findings_authorized: Vec<Finding>,
    pub findings_unauthorized: Vec<Finding>,
    pub methods_filtered: usize,
    /// Resource workers that panicked. Findings they streamed before dying
    /// are still counted above.
    pub worker_failures: usize,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ScanResult {
    pub fn empty(api: &Api) -> Self {
        ScanResult {
            api: api.clone(),
            status: ScanStatus::Empty,
            total_resources: 0,
            resources_scanned: 0,
            findings_authorized: vec![],
            findings_unauthorized: vec![],
            methods_filtered: 0,
            worker_failures: 0,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn failed(api: &Api, error: impl Into<String>) -> Self {
        ScanResult {
            status: ScanStatus::Failed,
            error: Some(error.into()),
            ..ScanResult::empty(api)
        }
    }

    pub fn protected_count(&self) -> usize {
        self.findings_authorized.len()
    }

    pub fn unprotected_count(&self) -> usize {
        self.findings_unauthorized.len()
    }

    pub fn total_methods(&self) -> usize {
        self.protected_count() + self.unprotected_count()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Unprotected findings that no whitelist category covers.
    pub fn unexpected_unprotected(&self) -> impl Iterator<Item = &Finding> {
        self.findings_unauthorized
            .iter()
            .filter(|f| !f.is_whitelisted())
    }
}

/// Totals over every API of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    pub total_apis: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_protected: usize,
    pub total_unprotected: usize,
    pub total_methods_filtered: usize,
    pub worker_failures: usize,
    /// Unprotected and not covered by any whitelist category.
    pub unexpected_unprotected: usize,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn from_results(results: &[ScanResult]) -> Self {
        results.iter().fold(
            RunSummary {
                total_apis: results.len(),
                ..RunSummary::default()
            },
            |mut s, r| {
                if r.is_failed() {
                    s.failed += 1;
                } else {
                    s.succeeded += 1;
                    s.total_protected += r.protected_count();
                    s.total_unprotected += r.unprotected_count();
                    s.unexpected_unprotected += r.unexpected_unprotected().count();
                }
                s.total_methods_filtered += r.methods_filtered;
                s.worker_failures += r.worker_failures;
                s.interrupted |= r.status == ScanStatus::Interrupted;
                s
            },
        )
    }

    /// Percentage of APIs scanned without error; `0.0` for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total_apis == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total_apis as f64 * 100.0
        }
    }
}
