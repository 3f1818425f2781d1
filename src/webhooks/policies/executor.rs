//! Executor reference policy.
//!
//! Validates:
//! - `spec.executor` is set
//! - The named executor exists in the SpinApp's namespace
//!
//! The resolved executor is returned so later policies can use it without a
//! second lookup.

use std::time::Duration;

use crate::crd::{SpinAppExecutorSpec, SpinAppSpec};
use crate::webhooks::field::{FieldError, FieldPath};
use crate::webhooks::resolver::{ExecutorLookupError, ExecutorResolver, resolve_with_timeout};

/// Rejection of the executor reference.
#[derive(Debug)]
pub struct ExecutorRejection {
    /// Diagnostic reported to the client
    pub error: FieldError,
    /// Underlying lookup failure, if a lookup was attempted
    pub cause: Option<ExecutorLookupError>,
}

/// Validate the executor reference and resolve it, waiting at most
/// `timeout` for the lookup
pub async fn validate<R: ExecutorResolver>(
    spec: &SpinAppSpec,
    namespace: &str,
    resolver: &R,
    timeout: Duration,
) -> Result<SpinAppExecutorSpec, ExecutorRejection> {
    let path = FieldPath::new("spec").child("executor");

    if spec.executor.is_empty() {
        return Err(ExecutorRejection {
            error: FieldError::invalid(
                path,
                spec.executor.as_str(),
                "executor must be set, likely no default executor was set because you have no executors installed",
            ),
            cause: None,
        });
    }

    // Not-found and backend failures get the same diagnostic
    resolve_with_timeout(resolver, &spec.executor, namespace, timeout)
        .await
        .map_err(|e| ExecutorRejection {
            error: FieldError::invalid(
                path,
                spec.executor.as_str(),
                "executor does not exist in namespace",
            ),
            cause: Some(e),
        })
}
