//! Host application.
//!
//! Owns the root scope and the named decorations (creator registries) that
//! webhook registrations leave behind.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{routing::MethodRouter, Router};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::RegistrationError;
use crate::scope::{Plugin, PreValidationHook, Scope};
use crate::webhooks::{self, CreatorRegistry, WebhookOptions};

/// Default maximum request body buffered for hooks (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

pub struct HostApp {
    root: Scope,
    decorations: HashMap<String, Arc<CreatorRegistry>>,
    body_limit: usize,
}

impl HostApp {
    pub fn new() -> Self {
        Self {
            root: Scope::new("root"),
            decorations: HashMap::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Add a route directly to the root scope.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.root.route(path, method_router);
        self
    }

    /// Add a hook guarding every route of the application.
    pub fn add_hook<H>(&mut self, hook: H) -> &mut Self
    where
        H: PreValidationHook + 'static,
    {
        self.root.add_hook(hook);
        self
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Scope {
        &mut self.root
    }

    /// Install a plugin into its own child scope of the root.
    pub async fn register(&mut self, name: &str, plugin: &dyn Plugin) -> anyhow::Result<()> {
        self.root.register(name, plugin).await
    }

    /// Register a group of webhooks. See [`webhooks::register`].
    pub async fn register_webhooks(
        &mut self,
        options: WebhookOptions,
    ) -> Result<(), RegistrationError> {
        webhooks::register(self, options).await
    }

    /// Expose a creator registry under `name`.
    ///
    /// Decorating the same name twice replaces the earlier registry.
    pub fn decorate(&mut self, name: impl Into<String>, registry: CreatorRegistry) {
        let name = name.into();
        let paths = registry.len();

        if let Some(previous) = self.decorations.insert(name.clone(), Arc::new(registry)) {
            warn!(
                namespace = %name,
                replaced_paths = previous.len(),
                "host_decoration_replaced"
            );
        }

        info!(namespace = %name, paths = paths, "host_decorated");
    }

    pub fn has_decoration(&self, name: &str) -> bool {
        self.decorations.contains_key(name)
    }

    /// Creator registry exposed under `namespace`.
    pub fn creators(&self, namespace: &str) -> Option<Arc<CreatorRegistry>> {
        self.decorations.get(namespace).cloned()
    }

    /// Build the router that serves every registered route.
    ///
    /// # Panics
    ///
    /// Panics if the same method is registered twice on one path.
    pub fn into_router(self) -> Router {
        info!(
            routes = self.root.route_count(),
            decorations = self.decorations.len(),
            body_limit = self.body_limit,
            "host_ready"
        );

        self.root
            .into_router(self.body_limit)
            .layer(TraceLayer::new_for_http())
    }
}

impl Default for HostApp {
    fn default() -> Self {
        Self::new()
    }
}
