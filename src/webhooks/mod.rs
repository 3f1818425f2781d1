//! Webhook module for validating SpinApp admission requests.
//!
//! - `field`: field-addressed diagnostics in API server format
//! - `resolver`: SpinAppExecutor lookup
//! - `policies`: the validation rules and the validator that runs them
//! - `server`: axum transport for AdmissionReview requests

pub mod field;
pub mod policies;
pub mod resolver;
mod server;

pub use field::{ErrorList, FieldError, FieldPath, InvalidError};
pub use policies::{AdmissionEvent, SpinAppValidator};
pub use resolver::{
    ExecutorLookupError, ExecutorResolver, KubeExecutorResolver, StaticExecutorResolver,
};
pub use server::{
    VALIDATE_SPINAPP_PATH, WebhookError, WebhookState, create_webhook_router, review_spinapp,
    run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
