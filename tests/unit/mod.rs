// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for spinapp-webhook.
//!
//! These tests run without a Kubernetes cluster and exercise the public
//! validation API end to end with an in-memory executor resolver.

#[path = "../common/mod.rs"]
mod common;

mod validator_tests {
    use super::common::fixtures::*;
    use spinapp_webhook::webhooks::{AdmissionEvent, SpinAppValidator, StaticExecutorResolver};

    fn validator() -> SpinAppValidator<StaticExecutorResolver> {
        SpinAppValidator::new(default_resolver())
    }

    fn messages(errors: &[spinapp_webhook::FieldError]) -> Vec<String> {
        errors.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_minimal_app_accepted() {
        let app = SpinAppBuilder::new("hello").build();
        assert!(
            validator()
                .validate(AdmissionEvent::Create(&app), "default")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_empty_executor_rejected_regardless_of_other_fields() {
        let spec = SpinAppBuilder::new("hello")
            .executor("")
            .replicas(3)
            .build_spec();

        let errors = validator().validate_spec(&spec, "default").await.unwrap_err();
        assert_eq!(
            messages(&errors),
            vec![
                "spec.executor: Invalid value: \"\": executor must be set, likely no default executor was set because you have no executors installed"
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_resolver_rejects() {
        let spec = SpinAppBuilder::new("hello").build_spec();
        let validator = SpinAppValidator::new(StaticExecutorResolver::failing("etcd timeout"));

        let errors = validator.validate_spec(&spec, "default").await.unwrap_err();
        assert_eq!(
            messages(&errors),
            vec![
                "spec.executor: Invalid value: \"containerd-shim-spin\": executor does not exist in namespace"
            ]
        );
    }

    #[tokio::test]
    async fn test_autoscaled_app_with_zero_replicas_accepted() {
        let spec = SpinAppBuilder::new("hello")
            .autoscaling(true)
            .replicas(0)
            .build_spec();
        assert!(validator().validate_spec(&spec, "default").await.is_ok());
    }

    #[tokio::test]
    async fn test_annotations_on_deploymentless_executor() {
        let spec = SpinAppBuilder::new("hello")
            .executor(DEPLOYMENTLESS_EXECUTOR)
            .deployment_annotation("key", "asdf")
            .pod_annotation("key", "asdf")
            .build_spec();

        let errors = validator().validate_spec(&spec, "default").await.unwrap_err();
        assert_eq!(
            messages(&errors),
            vec![
                r#"spec.deploymentAnnotations: Invalid value: {"key":"asdf"}: deploymentAnnotations can't be set when the executor does not use operator deployments"#,
                r#"spec.podAnnotations: Invalid value: {"key":"asdf"}: podAnnotations can't be set when the executor does not use operator deployments"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_annotations_on_deployment_executor() {
        let spec = SpinAppBuilder::new("hello")
            .deployment_annotation("key", "asdf")
            .pod_annotation("key", "asdf")
            .build_spec();
        assert_eq!(spec.pod_annotations, annotations("key", "asdf"));
        assert!(validator().validate_spec(&spec, "default").await.is_ok());
    }

    #[tokio::test]
    async fn test_invocation_limit_cases() {
        let cases = [
            (Some("40Mi"), None, Some("spec.invocationLimits[memory]: Invalid value: \"50Mi\": invocation limit quantity cannot be greater than the memory request (40Mi)")),
            (Some("40Mi"), Some("100Mi"), None),
            (None, Some("40Mi"), Some("spec.invocationLimits[memory]: Invalid value: \"50Mi\": invocation limit quantity cannot be greater than the memory limit (40Mi)")),
            (None, Some("100Mi"), None),
            (None, None, None),
        ];

        for (request, limit, expected) in cases {
            let mut builder = SpinAppBuilder::new("hello").invocation_limit("memory", "50Mi");
            if let Some(request) = request {
                builder = builder.request("memory", request);
            }
            if let Some(limit) = limit {
                builder = builder.limit("memory", limit);
            }

            let result = validator().validate_spec(&builder.build_spec(), "default").await;
            match expected {
                None => assert!(result.is_ok(), "request={request:?} limit={limit:?}"),
                Some(message) => assert_eq!(messages(&result.unwrap_err()), vec![message]),
            }
        }
    }

    #[tokio::test]
    async fn test_all_problems_reported_at_once() {
        let app = SpinAppBuilder::new("broken")
            .executor(DEPLOYMENTLESS_EXECUTOR)
            .replicas(0)
            .pod_annotation("team", "wasm")
            .limit("memory", "32Mi")
            .invocation_limit("memory", "64Mi")
            .build();

        let err = validator()
            .validate(AdmissionEvent::Create(&app), "default")
            .await
            .unwrap_err();
        assert_eq!(err.name, "broken");
        assert_eq!(err.qualified_kind, "SpinApp.core.spinkube.dev");
        assert_eq!(err.errors.len(), 3);
        assert!(err.to_string().starts_with(
            "SpinApp.core.spinkube.dev \"broken\" is invalid: [spec.replicas: Invalid value: 0: replicas must be > 0, "
        ));
    }

    #[tokio::test]
    async fn test_delete_never_blocked() {
        let app = SpinAppBuilder::new("broken").executor("").replicas(-3).build();
        assert!(
            validator()
                .validate(AdmissionEvent::Delete(&app), "default")
                .await
                .is_ok()
        );
    }
}

mod quantity_tests {
    use spinapp_webhook::quantity::{Quantity, QuantityFormat};

    #[test]
    fn test_memory_quantities_order() {
        let sizes: Vec<Quantity> = ["1Ki", "1M", "1Mi", "1G", "1Gi"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!("128Mi".parse::<Quantity>().unwrap().format(), QuantityFormat::BinarySi);
        assert_eq!("128M".parse::<Quantity>().unwrap().format(), QuantityFormat::DecimalSi);
        assert_eq!("128e6".parse::<Quantity>().unwrap().format(), QuantityFormat::DecimalExponent);
    }
}

mod config_tests {
    use spinapp_webhook::WebhookConfig;
    use spinapp_webhook::webhooks::VALIDATE_SPINAPP_PATH;

    #[test]
    fn test_default_paths() {
        let config = WebhookConfig::default();
        assert_eq!(config.cert_path.to_str(), Some("/etc/webhook/certs/tls.crt"));
        assert_eq!(config.key_path.to_str(), Some("/etc/webhook/certs/tls.key"));
        assert_eq!(
            VALIDATE_SPINAPP_PATH,
            "/validate-core-spinkube-dev-v1alpha1-spinapp"
        );
    }
}
