//! Webhook Server - receives GitHub webhooks behind signature verification.
//!
//! This binary:
//! - Mounts the GitHub receiver in its own webhook scope
//! - Verifies `X-Hub-Signature-256` on webhook routes only
//! - Optionally creates the repository hook on GitHub at startup
//! - Serves `/health` outside the webhook scope

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Json};
use serde::Serialize;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webhook_scope::github::{
    CreateRepositoryHook, GithubClient, HookSpec, Receiver, SignatureVerification,
};
use webhook_scope::{
    Config, CreatorRegistry, HostApp, WebhookDescriptor, WebhookOptions,
};

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("webhook_server_starting");

    let config = Config::from_env();
    info!(
        port = config.port,
        namespace = %config.namespace,
        github_webhook_path = %config.github_webhook_path,
        github_signing_configured = config.github_webhook_secret.is_some(),
        github_repository = ?config.github_repository,
        create_on_startup = config.create_on_startup,
        "config_loaded"
    );

    let mut host = HostApp::new().with_body_limit(config.body_limit);
    host.route("/health", get(health));

    let mut github = WebhookDescriptor::new(
        config.github_webhook_path.clone(),
        Receiver::new(config.github_webhook_path.clone()),
    );
    if let Some(creator) = github_creator(&config)? {
        github = github.with_creator(creator);
    }

    host.register_webhooks(
        WebhookOptions::new(SignatureVerification::new(
            config.github_webhook_secret.clone(),
        ))
        .webhook(github)
        .namespace(config.namespace.clone()),
    )
    .await
    .context("Failed to register webhooks")?;

    if config.create_on_startup {
        match host.creators(&config.namespace) {
            Some(creators) => create_webhooks(&creators).await,
            None => warn!(namespace = %config.namespace, "webhook_creators_missing"),
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "webhook_server_listening");

    axum::serve(listener, host.into_router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("webhook_server_shutdown_complete");

    Ok(())
}

/// Build the GitHub creator when token, repository and public URL are all set.
fn github_creator(config: &Config) -> Result<Option<CreateRepositoryHook>> {
    let (Some(token), Some(repository), Some(url)) = (
        config.github_token.as_ref(),
        config.github_repository.as_ref(),
        config.github_callback_url(),
    ) else {
        info!("github_creator_not_configured");
        return Ok(None);
    };

    let client = GithubClient::new(
        &config.github_api_url,
        token.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )?;

    let spec = HookSpec {
        url,
        secret: config.github_webhook_secret.clone(),
        events: config.github_events.clone(),
        active: true,
    };

    Ok(Some(CreateRepositoryHook::new(
        client,
        repository.clone(),
        spec,
    )))
}

/// Invoke every registered creator once. Failures are logged, not retried.
async fn create_webhooks(creators: &CreatorRegistry) {
    for path in creators.paths() {
        let Some(creator) = creators.get(path) else {
            continue;
        };

        match creator.create().await {
            Ok(created) => info!(path = %path, result = %created, "webhook_created"),
            Err(e) => error!(path = %path, error = %e, "webhook_create_failed"),
        }
    }
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("webhook_server_shutting_down");
}
