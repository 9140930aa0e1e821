//! Error types for webhook registration and request verification.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure while registering a group of webhooks on a host application.
///
/// Nothing from a failed registration is attached to the host.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The shared verification step failed to install into the webhook scope.
    #[error("verification failed to install into scope `{scope}`")]
    Verification {
        scope: String,
        #[source]
        source: anyhow::Error,
    },

    /// A webhook's route logic failed to install.
    #[error("webhook `{path}` failed to install its routes")]
    Routes {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Two descriptors in the same registration share a path.
    #[error("webhook path `{path}` is declared more than once")]
    DuplicatePath { path: String },
}

/// A request turned away by a pre-validation hook.
///
/// Defaults to `500 Internal Server Error`, which is what a hook that simply
/// fails produces.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Rejection {
    status: StatusCode,
    message: String,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error body returned for rejected requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status_code: self.status.as_u16(),
            error: self.status.canonical_reason().unwrap_or("Unknown"),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
