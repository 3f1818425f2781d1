//! Annotation scope validation policy.
//!
//! Deployment and pod annotations only have an effect when the executor
//! creates an operator-managed Deployment. For any other executor they are
//! rejected, each field with its own diagnostic.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::crd::{SpinAppExecutorSpec, SpinAppSpec};
use crate::webhooks::field::{FieldError, FieldPath};

/// Validate annotations against the resolved executor.
///
/// Without an executor nothing is checked; the executor policy has already
/// rejected the request in that case.
pub fn validate(spec: &SpinAppSpec, executor: Option<&SpinAppExecutorSpec>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let Some(executor) = executor else {
        return errors;
    };
    if executor.create_deployment {
        return errors;
    }

    let path = FieldPath::new("spec");

    if !spec.deployment_annotations.is_empty() {
        errors.push(FieldError::invalid(
            path.child("deploymentAnnotations"),
            annotations_value(&spec.deployment_annotations),
            "deploymentAnnotations can't be set when the executor does not use operator deployments",
        ));
    }

    if !spec.pod_annotations.is_empty() {
        errors.push(FieldError::invalid(
            path.child("podAnnotations"),
            annotations_value(&spec.pod_annotations),
            "podAnnotations can't be set when the executor does not use operator deployments",
        ));
    }

    errors
}

fn annotations_value(annotations: &BTreeMap<String, String>) -> Value {
    Value::Object(
        annotations
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}
