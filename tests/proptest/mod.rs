// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for spinapp-webhook.
//!
//! Uses proptest to generate random SpinApp specs and quantities and verify
//! the validation invariants.

#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{DEPLOYMENT_EXECUTOR, DEPLOYMENTLESS_EXECUTOR, SpinAppBuilder, default_resolver};
use proptest::prelude::*;
use spinapp_webhook::crd::SpinAppSpec;
use spinapp_webhook::quantity::Quantity;
use spinapp_webhook::webhooks::{AdmissionEvent, ErrorList, SpinAppValidator};

/// Strategy for executor names, including unset and unknown ones.
fn any_executor() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(DEPLOYMENT_EXECUTOR.to_string()),
        Just(DEPLOYMENTLESS_EXECUTOR.to_string()),
        "[a-z]{3,12}",
    ]
}

/// Strategy for small annotation maps.
fn any_annotations() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z]{1,8}", "[a-z0-9]{0,8}"), 0..3)
}

/// Strategy for memory quantities in Mi.
fn any_memory() -> impl Strategy<Value = Option<String>> {
    prop::option::of((1u32..2048).prop_map(|mi| format!("{mi}Mi")))
}

fn any_spec() -> impl Strategy<Value = SpinAppSpec> {
    (
        any_executor(),
        -2i32..10,
        any::<bool>(),
        any_annotations(),
        any_annotations(),
        any_memory(),
        any_memory(),
        any_memory(),
    )
        .prop_map(
            |(executor, replicas, autoscaling, deployment, pod, request, limit, invocation)| {
                let mut builder = SpinAppBuilder::new("app")
                    .executor(executor)
                    .replicas(replicas)
                    .autoscaling(autoscaling);
                for (k, v) in deployment {
                    builder = builder.deployment_annotation(k, v);
                }
                for (k, v) in pod {
                    builder = builder.pod_annotation(k, v);
                }
                if let Some(request) = request {
                    builder = builder.request("memory", &request);
                }
                if let Some(limit) = limit {
                    builder = builder.limit("memory", &limit);
                }
                if let Some(invocation) = invocation {
                    builder = builder.invocation_limit("memory", &invocation);
                }
                builder.build_spec()
            },
        )
}

fn run(spec: &SpinAppSpec) -> Result<(), ErrorList> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let validator = SpinAppValidator::new(default_resolver());
    runtime.block_on(validator.validate_spec(spec, "default"))
}

fn has_error_on(result: &Result<(), ErrorList>, field: &str) -> bool {
    match result {
        Ok(()) => false,
        Err(errors) => errors.iter().any(|e| e.field.to_string() == field),
    }
}

proptest! {
    /// Property: Validating the same spec twice gives identical results.
    #[test]
    fn test_validation_idempotent(spec in any_spec()) {
        prop_assert_eq!(run(&spec), run(&spec));
    }

    /// Property: Replicas rule matches the autoscaling contract exactly.
    #[test]
    fn test_replicas_rule(spec in any_spec()) {
        let rejected = has_error_on(&run(&spec), "spec.replicas");
        let expected = if spec.enable_autoscaling {
            spec.replicas != 0
        } else {
            spec.replicas < 1
        };
        prop_assert_eq!(rejected, expected);
    }

    /// Property: An unset executor always yields the executor error.
    #[test]
    fn test_empty_executor_always_rejected(mut spec in any_spec()) {
        spec.executor.clear();
        let result = run(&spec);
        prop_assert!(has_error_on(&result, "spec.executor"));
        prop_assert!(!has_error_on(&result, "spec.podAnnotations"));
        prop_assert!(!has_error_on(&result, "spec.deploymentAnnotations"));
    }

    /// Property: Deployment executors accept any annotations.
    #[test]
    fn test_deployment_executor_accepts_annotations(mut spec in any_spec()) {
        spec.executor = DEPLOYMENT_EXECUTOR.to_string();
        let result = run(&spec);
        prop_assert!(!has_error_on(&result, "spec.podAnnotations"));
        prop_assert!(!has_error_on(&result, "spec.deploymentAnnotations"));
    }

    /// Property: Deploymentless executors reject each non-empty annotation map.
    #[test]
    fn test_deploymentless_executor_rejects_annotations(mut spec in any_spec()) {
        spec.executor = DEPLOYMENTLESS_EXECUTOR.to_string();
        let result = run(&spec);
        prop_assert_eq!(
            has_error_on(&result, "spec.deploymentAnnotations"),
            !spec.deployment_annotations.is_empty()
        );
        prop_assert_eq!(
            has_error_on(&result, "spec.podAnnotations"),
            !spec.pod_annotations.is_empty()
        );
    }

    /// Property: The invocation limit never exceeds the tightest declared bound.
    #[test]
    fn test_invocation_limit_bound(spec in any_spec()) {
        let rejected = has_error_on(&run(&spec), "spec.invocationLimits[memory]");
        let invocation: Option<Quantity> = spec
            .invocation_limits
            .get("memory")
            .map(|v| v.parse().unwrap());
        let bound = spec
            .resources
            .limits
            .get("memory")
            .or_else(|| spec.resources.requests.get("memory"));
        let expected = match (invocation, bound) {
            (Some(invocation), Some(bound)) => invocation > *bound,
            _ => false,
        };
        prop_assert_eq!(rejected, expected);
    }

    /// Property: Delete events are always allowed.
    #[test]
    fn test_delete_always_allowed(spec in any_spec()) {
        let app = spinapp_webhook::crd::SpinApp::new("app", spec);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let validator = SpinAppValidator::new(default_resolver());
        let result = runtime.block_on(validator.validate(AdmissionEvent::Delete(&app), "default"));
        prop_assert!(result.is_ok());
    }

    /// Property: Quantity ordering agrees with byte counts.
    #[test]
    fn test_quantity_ordering(a in 0i64..(1 << 40), b in 0i64..(1 << 40)) {
        let qa: Quantity = format!("{a}").parse().unwrap();
        let qb: Quantity = format!("{}Ki", b).parse().unwrap();
        prop_assert_eq!(qa.cmp(&qb), a.cmp(&(b * 1024)));
    }

    /// Property: Rendering then parsing a quantity preserves its magnitude.
    #[test]
    fn test_quantity_render_parse(mi in 0i64..(1 << 20)) {
        let quantity: Quantity = format!("{mi}Mi").parse().unwrap();
        let reparsed: Quantity = quantity.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, quantity);
    }

    /// Property: Any exponent is either parsed or rejected, never overflowed.
    #[test]
    fn test_quantity_exponent_bounded(mantissa in "[0-9]{1,4}(\\.[0-9]{1,12})?", exp in any::<i32>()) {
        if let Ok(quantity) = format!("{mantissa}e{exp}").parse::<Quantity>() {
            let reparsed: Quantity = quantity.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, quantity);
        }
    }
}
