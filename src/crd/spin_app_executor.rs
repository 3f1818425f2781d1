//! SpinAppExecutor Custom Resource Definition.
//!
//! An executor describes how SpinApps referencing it are realized at runtime.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SpinAppExecutor configures the runtime for SpinApps that name it.
///
/// Example:
/// ```yaml
/// apiVersion: core.spinkube.dev/v1alpha1
/// kind: SpinAppExecutor
/// metadata:
///   name: containerd-shim-spin
/// spec:
///   createDeployment: true
///   deploymentConfig:
///     runtimeClassName: wasmtime-spin-v2
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "core.spinkube.dev",
    version = "v1alpha1",
    kind = "SpinAppExecutor",
    plural = "spinappexecutors",
    namespaced,
    printcolumn = r#"{"name":"CreateDeployment", "type":"boolean", "jsonPath":".spec.createDeployment"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SpinAppExecutorSpec {
    /// Whether the operator creates a Deployment for apps using this executor.
    /// Deployment and pod annotations are only meaningful when this is true.
    #[serde(default)]
    pub create_deployment: bool,

    /// Deployment settings, used when `create_deployment` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_config: Option<ExecutorDeploymentConfig>,
}

impl SpinAppExecutorSpec {
    /// Executor that provisions an operator-managed Deployment.
    pub fn with_deployment() -> Self {
        Self {
            create_deployment: true,
            deployment_config: None,
        }
    }

    /// Executor whose workloads are realized outside operator Deployments.
    pub fn without_deployment() -> Self {
        Self::default()
    }
}

/// Deployment settings for executors that create Deployments.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorDeploymentConfig {
    /// RuntimeClass used by the app's pods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_class_name: Option<String>,
}
