//! Custom Resource Definitions (CRDs) validated by the webhook.
//!
//! - `SpinApp`: A Spin application workload
//! - `SpinAppExecutor`: Runtime configuration referenced by SpinApps

mod spin_app;
mod spin_app_executor;

pub use spin_app::*;
pub use spin_app_executor::*;
