//! Scoped webhook registration.
//!
//! [`register`] puts a group of webhooks behind one shared verification step:
//!
//! 1. A new scope is created under the host root, named after the namespace.
//! 2. The verification plugin is installed into that scope.
//! 3. Each webhook's route logic is installed into its own child scope, in
//!    order, so the verification hooks guard every webhook route and nothing
//!    else in the application.
//! 4. Creators supplied by the webhooks are collected into a
//!    [`CreatorRegistry`] exposed on the host under the namespace.

pub mod creators;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::RegistrationError;
use crate::host::HostApp;
use crate::scope::{Plugin, Scope};

pub use creators::{creator_fn, Creator, CreatorFn, CreatorRegistry};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "webhooks";

/// One webhook: its path key, its route logic and an optional creator.
#[derive(Clone)]
pub struct WebhookDescriptor {
    path: String,
    routes: Arc<dyn Plugin>,
    create: Option<Arc<dyn Creator>>,
}

impl WebhookDescriptor {
    pub fn new(path: impl Into<String>, routes: impl Plugin + 'static) -> Self {
        Self {
            path: path.into(),
            routes: Arc::new(routes),
            create: None,
        }
    }

    pub fn with_creator(mut self, creator: impl Creator + 'static) -> Self {
        self.create = Some(Arc::new(creator));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn routes(&self) -> &Arc<dyn Plugin> {
        &self.routes
    }

    pub fn creator(&self) -> Option<&Arc<dyn Creator>> {
        self.create.as_ref()
    }
}

impl fmt::Debug for WebhookDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookDescriptor")
            .field("path", &self.path)
            .field("has_creator", &self.create.is_some())
            .finish()
    }
}

/// Options for one [`register`] call.
pub struct WebhookOptions {
    webhooks: Vec<WebhookDescriptor>,
    verification: Arc<dyn Plugin>,
    namespace: String,
}

impl WebhookOptions {
    pub fn new(verification: impl Plugin + 'static) -> Self {
        Self {
            webhooks: Vec::new(),
            verification: Arc::new(verification),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn webhook(mut self, webhook: WebhookDescriptor) -> Self {
        self.webhooks.push(webhook);
        self
    }

    pub fn webhooks(mut self, webhooks: impl IntoIterator<Item = WebhookDescriptor>) -> Self {
        self.webhooks.extend(webhooks);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace_name(&self) -> &str {
        &self.namespace
    }

    pub fn descriptors(&self) -> &[WebhookDescriptor] {
        &self.webhooks
    }
}

/// Register a group of webhooks on `host`.
///
/// On success the host gains the webhook routes, guarded by the
/// verification step, and a creator registry under the namespace. On
/// failure nothing is attached.
pub async fn register(
    host: &mut HostApp,
    options: WebhookOptions,
) -> Result<(), RegistrationError> {
    let WebhookOptions {
        webhooks,
        verification,
        namespace,
    } = options;

    if let Some(path) = duplicate_path(&webhooks) {
        warn!(namespace = %namespace, path = %path, "webhook_duplicate_path");
        return Err(RegistrationError::DuplicatePath { path });
    }

    let mut scope = Scope::new(namespace.clone());

    verification
        .install(&mut scope)
        .await
        .map_err(|source| RegistrationError::Verification {
            scope: namespace.clone(),
            source,
        })?;

    debug!(
        namespace = %namespace,
        hooks = scope.hooks().len(),
        "webhook_verification_installed"
    );

    let mut creators = CreatorRegistry::default();

    for webhook in webhooks {
        if let Some(create) = webhook.create {
            creators.insert(webhook.path.clone(), create);
        }

        scope
            .register(webhook.path.clone(), webhook.routes.as_ref())
            .await
            .map_err(|source| RegistrationError::Routes {
                path: webhook.path.clone(),
                source,
            })?;

        debug!(namespace = %namespace, path = %webhook.path, "webhook_routes_installed");
    }

    info!(
        namespace = %namespace,
        webhooks = scope.children().len(),
        routes = scope.route_count(),
        creators = creators.len(),
        "webhook_scope_registered"
    );

    host.root_mut().attach(scope);
    host.decorate(namespace, creators);

    Ok(())
}

/// First path declared by more than one descriptor.
fn duplicate_path(webhooks: &[WebhookDescriptor]) -> Option<String> {
    let mut seen = HashSet::new();
    webhooks
        .iter()
        .find(|webhook| !seen.insert(webhook.path.as_str()))
        .map(|webhook| webhook.path.clone())
}
