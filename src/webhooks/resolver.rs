//! SpinAppExecutor lookup.
//!
//! Validation needs the executor a SpinApp references. The lookup sits behind
//! [`ExecutorResolver`] so the webhook can use the API server while tests
//! use an in-memory table.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use kube::{Api, Client};
use thiserror::Error;

use crate::crd::{SpinAppExecutor, SpinAppExecutorSpec};

/// Default time allowed for a single executor lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `resolver.resolve` bounded by `timeout`.
///
/// A lookup that does not finish in time is abandoned and reported as
/// [`ExecutorLookupError::Timeout`].
pub async fn resolve_with_timeout<R: ExecutorResolver>(
    resolver: &R,
    name: &str,
    namespace: &str,
    timeout: Duration,
) -> Result<SpinAppExecutorSpec, ExecutorLookupError> {
    tokio::time::timeout(timeout, resolver.resolve(name, namespace))
        .await
        .unwrap_or(Err(ExecutorLookupError::Timeout(timeout)))
}

/// Why an executor could not be resolved.
#[derive(Error, Debug)]
pub enum ExecutorLookupError {
    /// No executor with that name exists in the namespace
    #[error("executor {name:?} not found in namespace {namespace:?}")]
    NotFound { name: String, namespace: String },

    /// The API server returned an error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The lookup did not finish in time
    #[error("executor lookup timed out after {0:?}")]
    Timeout(Duration),

    /// Backend failure outside the API server
    #[error("executor lookup failed: {0}")]
    Backend(String),
}

impl ExecutorLookupError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ExecutorLookupError::NotFound { .. } => false,
            ExecutorLookupError::Kube(kube::Error::Api(e)) => e.code >= 500 || e.code == 429,
            ExecutorLookupError::Kube(_) => true,
            ExecutorLookupError::Timeout(_) | ExecutorLookupError::Backend(_) => true,
        }
    }

    /// Short label for metrics.
    pub fn cause(&self) -> &'static str {
        match self {
            ExecutorLookupError::NotFound { .. } => "not_found",
            ExecutorLookupError::Kube(_) => "api_error",
            ExecutorLookupError::Timeout(_) => "timeout",
            ExecutorLookupError::Backend(_) => "backend",
        }
    }
}

/// Fetches a SpinAppExecutor by name.
///
/// `namespace` is always the namespace of the SpinApp being validated;
/// executors are never resolved across namespaces.
pub trait ExecutorResolver: Send + Sync {
    fn resolve(
        &self,
        name: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<SpinAppExecutorSpec, ExecutorLookupError>> + Send;
}

/// Resolves executors through the Kubernetes API.
#[derive(Clone)]
pub struct KubeExecutorResolver {
    client: Client,
}

impl KubeExecutorResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ExecutorResolver for KubeExecutorResolver {
    async fn resolve(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<SpinAppExecutorSpec, ExecutorLookupError> {
        let api: Api<SpinAppExecutor> = Api::namespaced(self.client.clone(), namespace);

        api.get_opt(name)
            .await?
            .map(|executor| executor.spec)
            .ok_or_else(|| ExecutorLookupError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }
}

/// In-memory resolver keyed by `(namespace, name)`.
///
/// Used by tests and local tooling where no cluster is available.
#[derive(Clone, Debug, Default)]
pub struct StaticExecutorResolver {
    executors: BTreeMap<(String, String), SpinAppExecutorSpec>,
    failure: Option<String>,
}

impl StaticExecutorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor.
    pub fn with_executor(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: SpinAppExecutorSpec,
    ) -> Self {
        self.executors.insert((namespace.into(), name.into()), spec);
        self
    }

    /// Fail every lookup with a backend error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            executors: BTreeMap::new(),
            failure: Some(message.into()),
        }
    }
}

impl ExecutorResolver for StaticExecutorResolver {
    async fn resolve(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<SpinAppExecutorSpec, ExecutorLookupError> {
        if let Some(message) = &self.failure {
            return Err(ExecutorLookupError::Backend(message.clone()));
        }
        self.executors
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ExecutorLookupError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }
}
