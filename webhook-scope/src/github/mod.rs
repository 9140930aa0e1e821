//! GitHub webhooks.
//!
//! Ready-made pieces for receiving GitHub deliveries behind a scoped
//! signature check:
//! - [`SignatureVerification`]: verification plugin checking `X-Hub-Signature-256`
//! - [`Receiver`]: route logic accepting deliveries on one path
//! - [`CreateRepositoryHook`]: creator registering the hook through the REST API

pub mod client;
pub mod receiver;
pub mod signature;

use async_trait::async_trait;
use axum::http::StatusCode;
use tracing::warn;

use crate::error::Rejection;
use crate::scope::{HookRequest, Plugin, PreValidationHook, Scope};

pub use client::{CreateRepositoryHook, GithubClient, HookSpec};
pub use receiver::{receive_event, GithubEvent, Receiver};
pub use signature::{is_signature_verification_enabled, verify_github_signature};

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Verification step for GitHub webhooks.
///
/// Without a secret every delivery is let through and a warning is logged.
pub struct SignatureVerification {
    secret: Option<String>,
}

impl SignatureVerification {
    pub fn new(secret: Option<String>) -> Self {
        let secret = if is_signature_verification_enabled(&secret) {
            secret
        } else {
            None
        };
        Self { secret }
    }
}

#[async_trait]
impl Plugin for SignatureVerification {
    async fn install(&self, scope: &mut Scope) -> anyhow::Result<()> {
        if self.secret.is_none() {
            warn!(scope = %scope.name(), "github_signature_not_configured");
        }
        scope.add_hook(SignatureHook {
            secret: self.secret.clone(),
        });
        Ok(())
    }
}

struct SignatureHook {
    secret: Option<String>,
}

#[async_trait]
impl PreValidationHook for SignatureHook {
    async fn check(&self, request: &HookRequest) -> Result<(), Rejection> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(());
        };

        let signature = request.header(SIGNATURE_HEADER).unwrap_or_default();
        if verify_github_signature(secret, request.body(), signature) {
            Ok(())
        } else {
            warn!(
                path = %request.path(),
                delivery = request.header(DELIVERY_HEADER).unwrap_or("unknown"),
                "github_signature_invalid"
            );
            Err(Rejection::with_status(
                StatusCode::UNAUTHORIZED,
                "invalid webhook signature",
            ))
        }
    }
}
