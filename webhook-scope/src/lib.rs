//! Webhook Scope - scoped webhook routes for axum applications.
//!
//! A host application registers groups of webhooks. Each group gets its own
//! encapsulation scope: the group's verification step guards the group's
//! routes and nothing else. Webhooks can also bring a "creator" that
//! registers them with the upstream service; creators are exposed on the host
//! under the group's namespace.
//!
//! ## Architecture
//!
//! ```text
//! WebhookOptions → register() → Scope (verification + routes) → HostApp root
//!                             └→ CreatorRegistry → HostApp decoration[namespace]
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut host = HostApp::new();
//! host.register_webhooks(
//!     WebhookOptions::new(SignatureVerification::new(secret))
//!         .webhook(WebhookDescriptor::new("/github", Receiver::new("/github"))),
//! )
//! .await?;
//! axum::serve(listener, host.into_router()).await?;
//! ```

pub mod config;
pub mod error;
pub mod github;
pub mod host;
pub mod scope;
pub mod webhooks;

// Re-export commonly used types
pub use config::Config;
pub use error::{RegistrationError, Rejection};
pub use host::HostApp;
pub use scope::{hook_fn, plugin_fn, HookRequest, Plugin, PreValidationHook, Scope};
pub use webhooks::{
    creator_fn, register, Creator, CreatorRegistry, WebhookDescriptor, WebhookOptions,
    DEFAULT_NAMESPACE,
};
