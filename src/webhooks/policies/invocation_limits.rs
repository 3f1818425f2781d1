//! Invocation limit validation policy.
//!
//! Validates:
//! - `spec.invocationLimits[memory]` is a valid quantity
//! - It does not exceed the app's memory limit, or its request when no limit is set
//!
//! Keys other than those in [`RECOGNIZED_INVOCATION_LIMITS`] pass through
//! unchecked so executors can introduce new limits without a webhook change.

use crate::crd::SpinAppSpec;
use crate::quantity::Quantity;
use crate::webhooks::field::{FieldError, FieldPath};

/// Resource name of the memory invocation limit
pub const MEMORY: &str = "memory";

/// Invocation limit keys this policy checks
pub const RECOGNIZED_INVOCATION_LIMITS: [&str; 1] = [MEMORY];

/// Validate the recognized invocation limits
pub fn validate(spec: &SpinAppSpec) -> Option<FieldError> {
    let limit = spec.invocation_limits.get(MEMORY)?;
    let path = FieldPath::new("spec").child("invocationLimits").key(MEMORY);

    let invocation_quantity: Quantity = match limit.parse() {
        Ok(quantity) => quantity,
        Err(_) => {
            return Some(FieldError::invalid(
                path,
                limit.as_str(),
                "memory limit must be a valid memory quantity (e.g. 128Mi, 1Gi)",
            ));
        }
    };

    validate_invocation_quantity(&invocation_quantity, spec, MEMORY, path)
}

/// Compare an invocation quantity with the app's request or limit for the
/// same resource.
///
/// With both declared the limit wins, since it is the bound that applies at
/// runtime. With neither declared there is nothing to compare against.
fn validate_invocation_quantity(
    invocation_quantity: &Quantity,
    spec: &SpinAppSpec,
    resource: &str,
    path: FieldPath,
) -> Option<FieldError> {
    let request = spec.resources.requests.get(resource);
    let limit = spec.resources.limits.get(resource);

    let (constraint, constraint_type) = match (request, limit) {
        (_, Some(limit)) => (limit, "limit"),
        (Some(request), None) => (request, "request"),
        (None, None) => return None,
    };

    if invocation_quantity > constraint {
        return Some(FieldError::invalid(
            path,
            invocation_quantity.to_string(),
            format!(
                "invocation limit quantity cannot be greater than the {} {} ({})",
                resource, constraint_type, constraint
            ),
        ));
    }

    None
}
