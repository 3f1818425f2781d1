//! Validation policies for SpinApp admission webhooks.
//!
//! Every policy runs on CREATE and UPDATE, in this order:
//! 1. Executor reference (resolves the executor for later policies)
//! 2. Replica count
//! 3. Annotation scope (needs the resolved executor)
//! 4. Invocation limits
//!
//! Errors from all policies are collected, so a client sees every problem
//! in one response. DELETE is never blocked.

pub mod annotations;
pub mod executor;
pub mod invocation_limits;
pub mod replicas;

use std::sync::Arc;
use std::time::{Duration, Instant};

use kube::{Resource, ResourceExt};
use tracing::{debug, info, warn};

use crate::crd::{SpinApp, SpinAppSpec};
use crate::health::HealthState;
use crate::webhooks::field::{ErrorList, InvalidError};
use crate::webhooks::resolver::{DEFAULT_LOOKUP_TIMEOUT, ExecutorResolver};

/// An admission event for a SpinApp
#[derive(Debug, Clone, Copy)]
pub enum AdmissionEvent<'a> {
    /// A new SpinApp is being created
    Create(&'a SpinApp),
    /// An existing SpinApp is being replaced
    Update { old: &'a SpinApp, new: &'a SpinApp },
    /// A SpinApp is being deleted
    Delete(&'a SpinApp),
}

impl AdmissionEvent<'_> {
    /// Operation name used in logs and metrics
    pub fn operation(&self) -> &'static str {
        match self {
            AdmissionEvent::Create(_) => "create",
            AdmissionEvent::Update { .. } => "update",
            AdmissionEvent::Delete(_) => "delete",
        }
    }

    /// The object the event is about (the new object for updates)
    pub fn object(&self) -> &SpinApp {
        match self {
            AdmissionEvent::Create(app) | AdmissionEvent::Delete(app) => app,
            AdmissionEvent::Update { new, .. } => new,
        }
    }
}

/// Validates SpinApps against their executor and internal consistency rules.
///
/// Holds no per-request state; one validator serves concurrent requests.
pub struct SpinAppValidator<R> {
    resolver: R,
    lookup_timeout: Duration,
    health_state: Option<Arc<HealthState>>,
}

impl<R: ExecutorResolver> SpinAppValidator<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            health_state: None,
        }
    }

    /// Bound each executor lookup by `timeout`
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Record executor lookup failures in the given health state's metrics
    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }

    /// Validate an admission event.
    ///
    /// `namespace` is the namespace the SpinApp lives in; its executor is
    /// looked up there.
    pub async fn validate(
        &self,
        event: AdmissionEvent<'_>,
        namespace: &str,
    ) -> Result<(), InvalidError> {
        let app = event.object();
        let name = app.name_any();
        let operation = event.operation();
        info!(name = %name, namespace = %namespace, operation, "validate {}", operation);

        let spec = match event {
            AdmissionEvent::Delete(_) => return Ok(()),
            AdmissionEvent::Create(app) | AdmissionEvent::Update { new: app, .. } => &app.spec,
        };

        let start = Instant::now();
        let result = self.validate_spec(spec, namespace).await;
        debug!(
            name = %name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "validation finished"
        );

        result.map_err(|errors| InvalidError::new(qualified_kind(), name, errors))
    }

    /// Run every policy against a spec and collect the field errors.
    pub async fn validate_spec(&self, spec: &SpinAppSpec, namespace: &str) -> Result<(), ErrorList> {
        let mut errors = ErrorList::new();

        let executor = match executor::validate(spec, namespace, &self.resolver, self.lookup_timeout).await {
            Ok(executor) => Some(executor),
            Err(rejection) => {
                if let Some(cause) = &rejection.cause {
                    warn!(
                        executor = %spec.executor,
                        namespace = %namespace,
                        error = %cause,
                        transient = cause.is_transient(),
                        "Executor lookup failed"
                    );
                    if let Some(state) = &self.health_state {
                        state.metrics.record_lookup_failure(cause.cause());
                    }
                }
                errors.push(rejection.error);
                None
            }
        };

        errors.extend(replicas::validate(spec));
        errors.extend(annotations::validate(spec, executor.as_ref()));
        errors.extend(invocation_limits::validate(spec));

        for key in spec.invocation_limits.keys() {
            if !invocation_limits::RECOGNIZED_INVOCATION_LIMITS.contains(&key.as_str()) {
                debug!(key = %key, "Ignoring unrecognized invocation limit");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// `SpinApp.core.spinkube.dev`
fn qualified_kind() -> String {
    format!("{}.{}", SpinApp::kind(&()), SpinApp::group(&()))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;
    use crate::crd::SpinAppExecutorSpec;
    use crate::webhooks::resolver::{ExecutorLookupError, StaticExecutorResolver};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn create_app(name: &str, spec: SpinAppSpec) -> SpinApp {
        SpinApp {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec,
        }
    }

    fn valid_spec() -> SpinAppSpec {
        SpinAppSpec {
            executor: "containerd-shim-spin".to_string(),
            replicas: 2,
            ..Default::default()
        }
    }

    fn validator() -> SpinAppValidator<StaticExecutorResolver> {
        SpinAppValidator::new(
            StaticExecutorResolver::new()
                .with_executor(
                    "default",
                    "containerd-shim-spin",
                    SpinAppExecutorSpec::with_deployment(),
                )
                .with_executor("default", "cyclotron", SpinAppExecutorSpec::without_deployment()),
        )
    }

    #[tokio::test]
    async fn test_valid_create() {
        let app = create_app("hello", valid_spec());
        let result = validator()
            .validate(AdmissionEvent::Create(&app), "default")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_valid_update() {
        let old = create_app("hello", valid_spec());
        let mut spec = valid_spec();
        spec.replicas = 5;
        let new = create_app("hello", spec);

        let result = validator()
            .validate(AdmissionEvent::Update { old: &old, new: &new }, "default")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_update_validates_new_object() {
        let old = create_app("hello", valid_spec());
        let mut spec = valid_spec();
        spec.replicas = 0;
        let new = create_app("hello", spec);

        let err = validator()
            .validate(AdmissionEvent::Update { old: &old, new: &new }, "default")
            .await
            .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field.to_string(), "spec.replicas");
    }

    #[tokio::test]
    async fn test_delete_always_allowed() {
        let app = create_app("broken", SpinAppSpec {
            replicas: -1,
            ..Default::default()
        });
        let resolver = StaticExecutorResolver::failing("unreachable");
        let result = SpinAppValidator::new(resolver)
            .validate(AdmissionEvent::Delete(&app), "default")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_errors_collected_in_rule_order() {
        let spec = SpinAppSpec {
            executor: "cyclotron".to_string(),
            replicas: 3,
            enable_autoscaling: true,
            deployment_annotations: BTreeMap::from([("a".to_string(), "1".to_string())]),
            pod_annotations: BTreeMap::from([("b".to_string(), "2".to_string())]),
            invocation_limits: BTreeMap::from([("memory".to_string(), "lots".to_string())]),
            ..Default::default()
        };

        let errors = validator()
            .validate_spec(&spec, "default")
            .await
            .unwrap_err();
        let fields: Vec<String> = errors.iter().map(|e| e.field.to_string()).collect();
        assert_eq!(
            fields,
            vec![
                "spec.replicas",
                "spec.deploymentAnnotations",
                "spec.podAnnotations",
                "spec.invocationLimits[memory]",
            ]
        );
    }

    #[tokio::test]
    async fn test_unresolved_executor_skips_annotations() {
        let spec = SpinAppSpec {
            executor: "missing".to_string(),
            replicas: 1,
            pod_annotations: BTreeMap::from([("b".to_string(), "2".to_string())]),
            ..Default::default()
        };

        let errors = validator()
            .validate_spec(&spec, "default")
            .await
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "spec.executor: Invalid value: \"missing\": executor does not exist in namespace"
        );
    }

    #[tokio::test]
    async fn test_executor_resolved_in_app_namespace() {
        let app = create_app("hello", valid_spec());
        let err = validator()
            .validate(AdmissionEvent::Create(&app), "other")
            .await
            .unwrap_err();
        assert_eq!(err.errors[0].detail, "executor does not exist in namespace");
    }

    #[tokio::test]
    async fn test_invalid_error_names_object() {
        let app = create_app("hello", SpinAppSpec {
            executor: "containerd-shim-spin".to_string(),
            replicas: 0,
            ..Default::default()
        });

        let err = validator()
            .validate(AdmissionEvent::Create(&app), "default")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "SpinApp.core.spinkube.dev \"hello\" is invalid: spec.replicas: Invalid value: 0: replicas must be > 0"
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_recorded_in_metrics() {
        let health_state = Arc::new(HealthState::new());
        let validator = SpinAppValidator::new(StaticExecutorResolver::failing("boom"))
            .with_health_state(health_state.clone());

        let result = validator.validate_spec(&valid_spec(), "default").await;
        assert!(result.is_err());
        assert!(
            health_state
                .metrics
                .encode()
                .contains("cause=\"backend\"")
        );
    }

    struct StalledResolver;

    impl ExecutorResolver for StalledResolver {
        async fn resolve(
            &self,
            _name: &str,
            _namespace: &str,
        ) -> Result<SpinAppExecutorSpec, ExecutorLookupError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_lookup_rejected_after_timeout() {
        let health_state = Arc::new(HealthState::new());
        let validator = SpinAppValidator::new(StalledResolver)
            .with_lookup_timeout(Duration::from_secs(2))
            .with_health_state(health_state.clone());

        let start = tokio::time::Instant::now();
        let errors = validator
            .validate_spec(&valid_spec(), "default")
            .await
            .unwrap_err();

        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "spec.executor: Invalid value: \"containerd-shim-spin\": executor does not exist in namespace"
        );
        assert!(
            health_state
                .metrics
                .encode()
                .contains("cause=\"timeout\"")
        );
    }

    #[tokio::test]
    async fn test_validation_is_idempotent() {
        let spec = SpinAppSpec {
            executor: String::new(),
            replicas: 0,
            ..Default::default()
        };
        let validator = validator();

        let first = validator.validate_spec(&spec, "default").await;
        let second = validator.validate_spec(&spec, "default").await;
        assert_eq!(first, second);
    }
}
