//! spinapp-webhook library crate
//!
//! Admission validation for SpinApp resources: the CRD definitions, the
//! quantity arithmetic used by resource checks, the validation policies and
//! the webhook and health servers that expose them.

pub mod config;
pub mod crd;
pub mod health;
pub mod quantity;
pub mod webhooks;

pub use config::{ConfigError, WebhookConfig};
pub use health::HealthState;
pub use webhooks::{
    AdmissionEvent, ExecutorResolver, FieldError, InvalidError, KubeExecutorResolver,
    SpinAppValidator, WebhookError, WebhookState, run_webhook_server,
};
