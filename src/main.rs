//! spinapp-webhook - Validating admission webhook for SpinApp resources.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads configuration from the environment
//! - Creates the Kubernetes client
//! - Starts the health server and, when certificates exist, the webhook server

use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tracing::{error, info, warn};

use spinapp_webhook::health::run_health_server;
use spinapp_webhook::{
    HealthState, KubeExecutorResolver, SpinAppValidator, WebhookConfig, WebhookState,
    run_webhook_server,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spinapp_webhook=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting spinapp-webhook");

    let config = WebhookConfig::from_env()?;
    info!(
        webhook_port = config.webhook_port,
        health_port = config.health_port,
        lookup_timeout_secs = config.executor_lookup_timeout.as_secs(),
        "Loaded configuration"
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Create shared health state
    let health_state = Arc::new(HealthState::new());

    // Start health server immediately so liveness probes pass during startup
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    // Start webhook server if certificates are available
    let webhook_handle = if config.tls_available() {
        info!("TLS certificates found, starting webhook server");
        let validator = SpinAppValidator::new(KubeExecutorResolver::new(client))
            .with_lookup_timeout(config.executor_lookup_timeout)
            .with_health_state(health_state.clone());
        let state = Arc::new(WebhookState::new(validator, Some(health_state.clone())));
        let config = config.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = run_webhook_server(state, &config).await {
                error!("Webhook server error: {}", e);
            }
        }))
    } else {
        warn!(
            cert_path = %config.cert_path.display(),
            key_path = %config.key_path.display(),
            "Webhook certificates not found, webhook server disabled"
        );
        None
    };

    // Ready once the webhook server has been started
    health_state.set_ready(webhook_handle.is_some()).await;

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        result = async {
            match webhook_handle {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Mark as not ready to stop receiving new admission requests
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
