//! Test fixtures and builder patterns for SpinApp.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use spinapp_webhook::crd::{SpinApp, SpinAppExecutorSpec, SpinAppSpec};
use spinapp_webhook::quantity::Quantity;
use spinapp_webhook::webhooks::StaticExecutorResolver;
use std::collections::BTreeMap;

/// Executor that creates Deployments, registered in `default`.
pub const DEPLOYMENT_EXECUTOR: &str = "containerd-shim-spin";
/// Executor without Deployments, registered in `default`.
pub const DEPLOYMENTLESS_EXECUTOR: &str = "cyclotron";

/// Builder for creating SpinApp test fixtures.
///
/// # Example
/// ```
/// let app = SpinAppBuilder::new("hello")
///     .namespace("test-ns")
///     .executor("containerd-shim-spin")
///     .replicas(3)
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct SpinAppBuilder {
    name: String,
    namespace: Option<String>,
    spec: SpinAppSpec,
}

impl SpinAppBuilder {
    /// Create a new builder with the given app name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some("default".to_string()),
            spec: SpinAppSpec {
                image: "ghcr.io/spinkube/hello-world:latest".to_string(),
                executor: DEPLOYMENT_EXECUTOR.to_string(),
                replicas: 1,
                ..Default::default()
            },
        }
    }

    /// Set the namespace for the app.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the executor name.
    pub fn executor(mut self, executor: impl Into<String>) -> Self {
        self.spec.executor = executor.into();
        self
    }

    /// Set the number of replicas.
    pub fn replicas(mut self, replicas: i32) -> Self {
        self.spec.replicas = replicas;
        self
    }

    /// Enable or disable autoscaling.
    pub fn autoscaling(mut self, enabled: bool) -> Self {
        self.spec.enable_autoscaling = enabled;
        self
    }

    /// Add a deployment annotation.
    pub fn deployment_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.deployment_annotations.insert(key.into(), value.into());
        self
    }

    /// Add a pod annotation.
    pub fn pod_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.pod_annotations.insert(key.into(), value.into());
        self
    }

    /// Set a resource request, e.g. `request("memory", "40Mi")`.
    pub fn request(mut self, resource: &str, quantity: &str) -> Self {
        self.spec
            .resources
            .requests
            .insert(resource.to_string(), parse_quantity(quantity));
        self
    }

    /// Set a resource limit, e.g. `limit("memory", "100Mi")`.
    pub fn limit(mut self, resource: &str, quantity: &str) -> Self {
        self.spec
            .resources
            .limits
            .insert(resource.to_string(), parse_quantity(quantity));
        self
    }

    /// Set an invocation limit, e.g. `invocation_limit("memory", "50Mi")`.
    pub fn invocation_limit(mut self, resource: &str, value: &str) -> Self {
        self.spec
            .invocation_limits
            .insert(resource.to_string(), value.to_string());
        self
    }

    /// Build only the SpinAppSpec.
    pub fn build_spec(self) -> SpinAppSpec {
        self.spec
    }

    /// Build the SpinApp.
    pub fn build(self) -> SpinApp {
        SpinApp {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: self.namespace,
                ..Default::default()
            },
            spec: self.spec,
        }
    }
}

impl Default for SpinAppBuilder {
    fn default() -> Self {
        Self::new("test-app")
    }
}

#[allow(clippy::expect_used)]
fn parse_quantity(quantity: &str) -> Quantity {
    quantity.parse().expect("fixture quantity should parse")
}

/// Resolver with one deployment executor and one deploymentless executor in `default`.
pub fn default_resolver() -> StaticExecutorResolver {
    StaticExecutorResolver::new()
        .with_executor(
            "default",
            DEPLOYMENT_EXECUTOR,
            SpinAppExecutorSpec::with_deployment(),
        )
        .with_executor(
            "default",
            DEPLOYMENTLESS_EXECUTOR,
            SpinAppExecutorSpec::without_deployment(),
        )
}

/// Annotation map with a single entry.
pub fn annotations(key: &str, value: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(key.to_string(), value.to_string())])
}
