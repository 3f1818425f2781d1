//! Admission webhook server.
//!
//! Provides HTTP endpoints for Kubernetes admission webhooks.
//!
//! To enable webhooks:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a ValidatingWebhookConfiguration pointing at
//!    `/validate-core-spinkube-dev-v1alpha1-spinapp` for CREATE and UPDATE
//! 3. Mount the TLS certificate secret to the webhook pod at /etc/webhook/certs/
//!
//! The webhook server starts automatically when certificates are present.

use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::{Resource, ResourceExt};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::WebhookConfig;
use crate::crd::SpinApp;
use crate::health::HealthState;
use crate::webhooks::policies::{AdmissionEvent, SpinAppValidator};
use crate::webhooks::resolver::ExecutorResolver;

/// Path the SpinApp validating webhook is served on
pub const VALIDATE_SPINAPP_PATH: &str = "/validate-core-spinkube-dev-v1alpha1-spinapp";

/// Shared state for webhook handlers
pub struct WebhookState<R> {
    pub validator: SpinAppValidator<R>,
    pub health_state: Option<Arc<HealthState>>,
}

impl<R: ExecutorResolver> WebhookState<R> {
    pub fn new(validator: SpinAppValidator<R>, health_state: Option<Arc<HealthState>>) -> Self {
        Self {
            validator,
            health_state,
        }
    }
}

/// Create a denial response with reason embedded in message.
/// kube-rs deny() only sets status.message, so we format as "[reason] message"
fn deny_with_reason<T: Resource<DynamicType = ()>>(
    request: &AdmissionRequest<T>,
    message: &str,
    reason: &str,
) -> AdmissionReview<DynamicObject> {
    let full_message = format!("[{}] {}", reason, message);
    AdmissionResponse::from(request)
        .deny(full_message)
        .into_review()
}

/// Create the webhook router
pub fn create_webhook_router<R>(state: Arc<WebhookState<R>>) -> Router
where
    R: ExecutorResolver + 'static,
{
    Router::new()
        .route(VALIDATE_SPINAPP_PATH, post(validate_spinapp::<R>))
        .with_state(state)
}

/// SpinApp admission webhook handler
async fn validate_spinapp<R>(
    State(state): State<Arc<WebhookState<R>>>,
    Json(review): Json<AdmissionReview<SpinApp>>,
) -> impl IntoResponse
where
    R: ExecutorResolver + 'static,
{
    let (status, review) = review_spinapp(&state, review).await;
    (status, Json(review))
}

/// Decide an AdmissionReview for a SpinApp.
///
/// Separated from the axum handler so it can be driven directly.
pub async fn review_spinapp<R: ExecutorResolver>(
    state: &WebhookState<R>,
    review: AdmissionReview<SpinApp>,
) -> (StatusCode, AdmissionReview<DynamicObject>) {
    let request: AdmissionRequest<SpinApp> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            return (
                StatusCode::BAD_REQUEST,
                AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e)).into_review(),
            );
        }
    };

    let uid = &request.uid;
    debug!(
        uid = %uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        dry_run = request.dry_run,
        "Processing admission request"
    );

    let start = Instant::now();
    let operation = operation_label(&request.operation);

    // DELETE and CONNECT are never blocked
    if matches!(request.operation, Operation::Delete | Operation::Connect) {
        info!(uid = %uid, operation, "Admission request allowed");
        record(state, operation, "allowed", start);
        return (
            StatusCode::OK,
            AdmissionResponse::from(&request).into_review(),
        );
    }

    let resource = match &request.object {
        Some(obj) => obj,
        None => {
            error!(uid = %uid, "Missing object in request");
            record(state, operation, "denied", start);
            return (
                StatusCode::OK,
                deny_with_reason(&request, "Missing object in request", "InvalidRequest"),
            );
        }
    };

    // Apps without metadata.namespace inherit the request namespace
    let namespace = request
        .namespace
        .clone()
        .or_else(|| resource.namespace())
        .unwrap_or_default();

    let event = match (&request.operation, &request.old_object) {
        (Operation::Update, Some(old)) => AdmissionEvent::Update { old, new: resource },
        _ => AdmissionEvent::Create(resource),
    };

    match state.validator.validate(event, &namespace).await {
        Ok(()) => {
            info!(uid = %uid, operation, "Admission request allowed");
            record(state, operation, "allowed", start);
            (
                StatusCode::OK,
                AdmissionResponse::from(&request).into_review(),
            )
        }
        Err(invalid) => {
            warn!(
                uid = %uid,
                operation,
                errors = invalid.errors.len(),
                message = %invalid,
                "Admission request denied"
            );
            record(state, operation, "denied", start);
            (
                StatusCode::OK,
                AdmissionResponse::from(&request)
                    .deny(invalid.to_string())
                    .into_review(),
            )
        }
    }
}

fn operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "create",
        Operation::Update => "update",
        Operation::Delete => "delete",
        Operation::Connect => "connect",
    }
}

fn record<R>(state: &WebhookState<R>, operation: &str, outcome: &str, start: Instant) {
    if let Some(health_state) = &state.health_state {
        health_state
            .metrics
            .record_admission(operation, outcome, start.elapsed().as_secs_f64());
    }
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0 on the configured port and serves the SpinApp
/// validation endpoint. TLS certificates are loaded from the configured
/// PEM files.
pub async fn run_webhook_server<R>(
    state: Arc<WebhookState<R>>,
    config: &WebhookConfig,
) -> Result<(), WebhookError>
where
    R: ExecutorResolver + 'static,
{
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;

    let app = create_webhook_router(state);

    let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    info!(port = config.webhook_port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
