//! Route logic receiving GitHub deliveries.

use async_trait::async_trait;
use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{DELIVERY_HEADER, EVENT_HEADER};
use crate::scope::{Plugin, Scope};

/// Installs `POST <path>` accepting GitHub deliveries.
pub struct Receiver {
    path: String,
}

impl Receiver {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Plugin for Receiver {
    async fn install(&self, scope: &mut Scope) -> anyhow::Result<()> {
        scope.route(&self.path, post(receive_event));
        Ok(())
    }
}

/// The subset of a delivery payload that is logged.
///
/// Fields not listed here are ignored.
#[derive(Debug, Deserialize)]
pub struct GithubEvent {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub zen: Option<String>,
    #[serde(default)]
    pub hook_id: Option<u64>,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// GitHub delivery endpoint.
pub async fn receive_event(
    headers: HeaderMap,
    Json(event): Json<GithubEvent>,
) -> impl IntoResponse {
    let kind = header_value(&headers, EVENT_HEADER).unwrap_or("unknown");
    let delivery = header_value(&headers, DELIVERY_HEADER).unwrap_or("unknown");
    let repository = event
        .repository
        .as_ref()
        .map(|r| r.full_name.as_str())
        .unwrap_or("");

    if kind == "ping" {
        info!(
            delivery = %delivery,
            hook_id = ?event.hook_id,
            zen = event.zen.as_deref().unwrap_or(""),
            "github_ping_received"
        );
    } else {
        info!(
            event = %kind,
            delivery = %delivery,
            action = event.action.as_deref().unwrap_or(""),
            repository = %repository,
            git_ref = event.git_ref.as_deref().unwrap_or(""),
            "github_event_received"
        );
    }

    (StatusCode::OK, "OK")
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
