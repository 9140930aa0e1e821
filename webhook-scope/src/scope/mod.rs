//! Encapsulation scopes.
//!
//! A host application is a tree of named scopes. Each scope owns its own
//! hooks and routes; the hooks that guard a route are those of the scope
//! that owns it plus every ancestor up to the root. Siblings never see each
//! other's hooks.
//!
//! ```text
//! root                      hooks: []
//! ├── /health
//! └── webhooks              hooks: [verification]
//!     ├── /github           hooks: []   → guarded by [verification]
//!     └── /stripe           hooks: []   → guarded by [verification]
//! ```

pub mod hook;
pub mod plugin;

use std::sync::Arc;

use axum::{middleware, routing::MethodRouter, Router};
use tracing::debug;

pub use hook::{hook_fn, HookFn, HookRequest, PreValidationHook};
pub use plugin::{plugin_fn, Plugin, PluginFn};

use hook::{run_hooks, HookChain};

/// One node of the scope tree.
pub struct Scope {
    name: String,
    hooks: Vec<Arc<dyn PreValidationHook>>,
    routes: Vec<(String, MethodRouter)>,
    children: Vec<Scope>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: Vec::new(),
            routes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a hook guarding every route of this scope and its descendants.
    pub fn add_hook<H>(&mut self, hook: H) -> &mut Self
    where
        H: PreValidationHook + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Add a route owned by this scope.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.routes.push((path.to_string(), method_router));
        self
    }

    /// Attach an already built child scope.
    pub fn attach(&mut self, child: Scope) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Create a child scope, install `plugin` into it and attach it.
    ///
    /// If installation fails the child is dropped and the error returned.
    pub async fn register(
        &mut self,
        name: impl Into<String>,
        plugin: &dyn Plugin,
    ) -> anyhow::Result<()> {
        let mut child = Scope::new(name);
        plugin.install(&mut child).await?;

        debug!(
            parent = %self.name,
            scope = %child.name,
            hooks = child.hooks.len(),
            routes = child.route_count(),
            "scope_registered"
        );

        self.children.push(child);
        Ok(())
    }

    pub fn hooks(&self) -> &[Arc<dyn PreValidationHook>] {
        &self.hooks
    }

    pub fn children(&self) -> &[Scope] {
        &self.children
    }

    /// Paths of the routes owned directly by this scope.
    pub fn route_paths(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(path, _)| path.as_str())
    }

    /// Number of routes in this scope and all descendants.
    pub fn route_count(&self) -> usize {
        self.routes.len()
            + self
                .children
                .iter()
                .map(Scope::route_count)
                .sum::<usize>()
    }

    /// Hook chains guarding `path`, one per route registered on it.
    ///
    /// Several scopes may own the same path under different methods; each
    /// owner contributes its own chain (root first), in depth-first order.
    /// Empty when no scope in the tree owns the path.
    pub fn hooks_for(&self, path: &str) -> Vec<Vec<Arc<dyn PreValidationHook>>> {
        let mut chains = Vec::new();
        self.resolve(path, &mut Vec::new(), &mut chains);
        chains
    }

    fn resolve(
        &self,
        path: &str,
        chain: &mut Vec<Arc<dyn PreValidationHook>>,
        chains: &mut Vec<Vec<Arc<dyn PreValidationHook>>>,
    ) {
        let base = chain.len();
        chain.extend(self.hooks.iter().cloned());

        for (route_path, _) in &self.routes {
            if route_path == path {
                chains.push(chain.clone());
            }
        }
        for child in &self.children {
            child.resolve(path, chain, chains);
        }

        chain.truncate(base);
    }

    /// Materialise the tree into an axum router.
    ///
    /// # Panics
    ///
    /// Panics if two scopes register the same method on the same path.
    pub(crate) fn into_router(self, body_limit: usize) -> Router {
        self.collect_routes(&[], body_limit, Router::new())
    }

    fn collect_routes(
        self,
        inherited: &[Arc<dyn PreValidationHook>],
        body_limit: usize,
        mut router: Router,
    ) -> Router {
        let mut chain = inherited.to_vec();
        chain.extend(self.hooks);

        for (path, method_router) in self.routes {
            let method_router = if chain.is_empty() {
                method_router
            } else {
                let hook_chain = HookChain {
                    route: Arc::from(path.as_str()),
                    hooks: Arc::from(chain.clone()),
                    body_limit,
                };
                method_router.route_layer(middleware::from_fn_with_state(hook_chain, run_hooks))
            };
            router = router.route(&path, method_router);
        }

        for child in self.children {
            router = child.collect_routes(&chain, body_limit, router);
        }

        router
    }
}
