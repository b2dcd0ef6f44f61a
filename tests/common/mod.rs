#![allow(dead_code)]

use api_guardian::error::GatewayError;
use api_guardian::finding::Finding;
use api_guardian::gateway::ApiGateway;
use api_guardian::model::{
    Api, AuthorizationType, AuthorizerDetail, IntegrationDetail, MethodAuthorization, Resource,
};
use api_guardian::scanner::{NoopObserver, ScanCancellation, ScanContext};
use api_guardian::whitelist::WhitelistPolicy;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub type MemorySink = Mutex<Vec<Finding>>;

type MethodKey = (String, String, String);

/// In-memory gateway with call counters and injectable failures.
#[derive(Default)]
pub struct MockGateway {
    apis: Vec<Api>,
    resources: HashMap<String, Vec<Resource>>,
    methods: HashMap<MethodKey, MethodAuthorization>,
    authorizers: HashMap<(String, String), AuthorizerDetail>,
    integrations: HashMap<MethodKey, IntegrationDetail>,

    pub fail_list_apis: bool,
    pub failing_resource_lists: HashSet<String>,
    pub failing_method_sets: HashSet<String>,
    pub failing_method_auth: HashSet<(String, String)>,
    pub failing_authorizers: HashSet<String>,
    pub panicking_resources: HashSet<String>,
    pub panicking_integrations: HashSet<(String, String)>,
    pub latency: Duration,

    pub authorizer_fetches: AtomicUsize,
    pub resource_method_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api(mut self, id: &str, name: &str) -> Self {
        self.apis.push(Api::new(id, name));
        self.resources.entry(id.to_string()).or_default();
        self
    }

    /// Adds a resource with its methods and their authorization. Every method
    /// gets an HTTP integration pointing at `https://backend.internal<path>`.
    pub fn with_resource(
        mut self,
        api_id: &str,
        resource_id: &str,
        path: &str,
        methods: &[(&str, MethodAuthorization)],
    ) -> Self {
        let method_names = methods.iter().map(|(m, _)| m.to_string()).collect();
        self.resources
            .entry(api_id.to_string())
            .or_default()
            .push(Resource {
                id: resource_id.to_string(),
                path: path.to_string(),
                method_names,
            });
        for (method, auth) in methods {
            let key = (api_id.to_string(), resource_id.to_string(), method.to_string());
            self.methods.insert(key.clone(), auth.clone());
            self.integrations.insert(
                key,
                IntegrationDetail {
                    uri: format!("https://backend.internal{path}"),
                    kind: "HTTP_PROXY".to_string(),
                    ..IntegrationDetail::default()
                },
            );
        }
        self
    }

    pub fn with_authorizer(mut self, api_id: &str, id: &str, name: &str) -> Self {
        self.authorizers
            .insert((api_id.to_string(), id.to_string()), authorizer(id, name));
        self
    }

    pub fn without_integration(mut self, api_id: &str, resource_id: &str, method: &str) -> Self {
        self.integrations.remove(&(
            api_id.to_string(),
            resource_id.to_string(),
            method.to_string(),
        ));
        self
    }

    fn delay(&self) {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }
}

impl ApiGateway for MockGateway {
    fn list_apis(&self) -> Result<Vec<Api>, GatewayError> {
        if self.fail_list_apis {
            return Err(GatewayError::CommandFailed {
                operation: "get-rest-apis".to_string(),
                message: "AccessDenied".to_string(),
            });
        }
        Ok(self.apis.clone())
    }

    fn list_resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError> {
        if self.failing_resource_lists.contains(api_id) {
            return Err(GatewayError::CommandFailed {
                operation: "get-resources".to_string(),
                message: "throttled".to_string(),
            });
        }
        self.resources
            .get(api_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(api_id.to_string()))
    }

    fn get_resource_methods(
        &self,
        api_id: &str,
        resource_id: &str,
    ) -> Result<BTreeSet<String>, GatewayError> {
        if self.panicking_resources.contains(resource_id) {
            panic!("boom in {resource_id}");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.resource_method_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_method_sets.contains(resource_id) {
            return Err(GatewayError::CommandFailed {
                operation: "get-resource".to_string(),
                message: "throttled".to_string(),
            });
        }
        self.resources
            .get(api_id)
            .and_then(|rs| rs.iter().find(|r| r.id == resource_id))
            .map(|r| r.method_names.clone())
            .ok_or_else(|| GatewayError::NotFound(resource_id.to_string()))
    }

    fn get_method_authorization(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &str,
    ) -> Result<MethodAuthorization, GatewayError> {
        if self
            .failing_method_auth
            .contains(&(resource_id.to_string(), method.to_string()))
        {
            return Err(GatewayError::CommandFailed {
                operation: "get-method".to_string(),
                message: "throttled".to_string(),
            });
        }
        self.methods
            .get(&(api_id.to_string(), resource_id.to_string(), method.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("{resource_id} {method}")))
    }

    fn get_authorizer_detail(
        &self,
        api_id: &str,
        authorizer_id: &str,
    ) -> Result<AuthorizerDetail, GatewayError> {
        self.authorizer_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay();
        if self.failing_authorizers.contains(authorizer_id) {
            return Err(GatewayError::CommandFailed {
                operation: "get-authorizer".to_string(),
                message: "throttled".to_string(),
            });
        }
        self.authorizers
            .get(&(api_id.to_string(), authorizer_id.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(authorizer_id.to_string()))
    }

    fn get_integration_detail(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &str,
    ) -> Result<IntegrationDetail, GatewayError> {
        if self
            .panicking_integrations
            .contains(&(resource_id.to_string(), method.to_string()))
        {
            panic!("boom in {resource_id} {method}");
        }
        self.integrations
            .get(&(api_id.to_string(), resource_id.to_string(), method.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound("integration".to_string()))
    }
}

pub fn auth(kind: AuthorizationType, authorizer_id: Option<&str>, api_key: bool) -> MethodAuthorization {
    MethodAuthorization {
        authorization_type: kind,
        authorizer_id: authorizer_id.map(str::to_string),
        api_key_required: api_key,
        authorizer_detail: None,
        identity_source: None,
    }
}

pub fn open() -> MethodAuthorization {
    auth(AuthorizationType::None, None, false)
}

pub fn custom(authorizer_id: &str) -> MethodAuthorization {
    auth(AuthorizationType::Custom, Some(authorizer_id), false)
}

pub fn iam() -> MethodAuthorization {
    auth(AuthorizationType::AwsIam, None, false)
}

pub fn authorizer(id: &str, name: &str) -> AuthorizerDetail {
    AuthorizerDetail {
        id: id.to_string(),
        name: name.to_string(),
        kind: "TOKEN".to_string(),
        identity_source: Some("method.request.header.Authorization".to_string()),
        validation_expression: None,
        uri: None,
        credentials: None,
        result_ttl_seconds: Some(300),
    }
}

pub fn excluded_options() -> Vec<String> {
    vec!["OPTIONS".to_string()]
}

/// A context with no observer.
pub fn context<'a>(
    gateway: &'a MockGateway,
    policy: &'a WhitelistPolicy,
    sink: &'a MemorySink,
    cancellation: &'a ScanCancellation,
    excluded_methods: &'a [String],
) -> ScanContext<'a> {
    ScanContext {
        gateway,
        policy,
        sink,
        observer: &NoopObserver,
        cancellation,
        excluded_methods,
    }
}

pub fn sink() -> MemorySink {
    Mutex::new(Vec::new())
}

pub fn recorded(sink: &MemorySink) -> Vec<Finding> {
    sink.lock().unwrap().clone()
}
