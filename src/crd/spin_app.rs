//! SpinApp Custom Resource Definition.
//!
//! A SpinApp describes a Spin application workload and names the
//! SpinAppExecutor responsible for running it.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// SpinApp is a custom resource for running Spin applications.
///
/// Example:
/// ```yaml
/// apiVersion: core.spinkube.dev/v1alpha1
/// kind: SpinApp
/// metadata:
///   name: hello
/// spec:
///   image: ghcr.io/spinkube/hello-world:latest
///   executor: containerd-shim-spin
///   replicas: 2
///   resources:
///     limits:
///       memory: 128Mi
///   invocationLimits:
///     memory: 64Mi
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "core.spinkube.dev",
    version = "v1alpha1",
    kind = "SpinApp",
    plural = "spinapps",
    namespaced,
    printcolumn = r#"{"name":"Executor", "type":"string", "jsonPath":".spec.executor"}"#,
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SpinAppSpec {
    /// Container image holding the Spin application.
    #[serde(default)]
    pub image: String,

    /// Name of the SpinAppExecutor that runs this app. The executor must live
    /// in the same namespace as the app.
    #[serde(default)]
    pub executor: String,

    /// Number of replicas to run. Must be 0 when autoscaling is enabled.
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Delegates the replica count to an autoscaler.
    #[serde(default)]
    pub enable_autoscaling: bool,

    /// Annotations applied to the Deployment created for the app.
    #[serde(default)]
    pub deployment_annotations: BTreeMap<String, String>,

    /// Annotations applied to the pods of the app.
    #[serde(default)]
    pub pod_annotations: BTreeMap<String, String>,

    /// Compute resources for the app's pods.
    #[serde(default)]
    pub resources: Resources,

    /// Per-invocation resource limits enforced by the runtime.
    /// Only `memory` is currently recognized.
    #[serde(default)]
    pub invocation_limits: BTreeMap<String, String>,
}

impl Default for SpinAppSpec {
    fn default() -> Self {
        Self {
            image: String::new(),
            executor: String::new(),
            replicas: default_replicas(),
            enable_autoscaling: false,
            deployment_annotations: BTreeMap::new(),
            pod_annotations: BTreeMap::new(),
            resources: Resources::default(),
            invocation_limits: BTreeMap::new(),
        }
    }
}

fn default_replicas() -> i32 {
    1
}

/// Resource requests and limits keyed by resource name (`cpu`, `memory`, ...).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Minimum resources the app requires.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[schemars(with = "BTreeMap<String, String>")]
    pub requests: BTreeMap<String, Quantity>,

    /// Maximum resources the app may use.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[schemars(with = "BTreeMap<String, String>")]
    pub limits: BTreeMap<String, Quantity>,
}
