//! Replica count validation policy.
//!
//! Validates:
//! - `spec.replicas` is 0 when autoscaling is enabled (the autoscaler owns the count)
//! - `spec.replicas` is at least 1 when autoscaling is disabled

use crate::crd::SpinAppSpec;
use crate::webhooks::field::{FieldError, FieldPath};

/// Minimum replica count for apps that are not autoscaled
pub const MIN_STATIC_REPLICAS: i32 = 1;

/// Validate the replica count against the autoscaling setting
pub fn validate(spec: &SpinAppSpec) -> Option<FieldError> {
    let path = FieldPath::new("spec").child("replicas");

    if spec.enable_autoscaling && spec.replicas != 0 {
        return Some(FieldError::invalid(
            path,
            spec.replicas,
            "replicas cannot be set when autoscaling is enabled",
        ));
    }

    if !spec.enable_autoscaling && spec.replicas < MIN_STATIC_REPLICAS {
        return Some(FieldError::invalid(
            path,
            spec.replicas,
            "replicas must be > 0",
        ));
    }

    None
}
