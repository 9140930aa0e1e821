//! Installation capabilities for scopes.

use async_trait::async_trait;

use super::Scope;

/// Something that installs routes and/or hooks into a scope.
///
/// Route logic installs handlers; a verification step installs
/// pre-validation hooks. Both run once, at registration time.
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn install(&self, scope: &mut Scope) -> anyhow::Result<()>;
}

/// A [`Plugin`] backed by a synchronous closure.
pub struct PluginFn<F> {
    f: F,
}

/// Build a plugin from a closure.
///
/// ```rust,ignore
/// let routes = plugin_fn(|scope| {
///     scope.route("/webhook", post(|| async { "OK" }));
///     Ok(())
/// });
/// ```
pub fn plugin_fn<F>(f: F) -> PluginFn<F>
where
    F: Fn(&mut Scope) -> anyhow::Result<()> + Send + Sync,
{
    PluginFn { f }
}

#[async_trait]
impl<F> Plugin for PluginFn<F>
where
    F: Fn(&mut Scope) -> anyhow::Result<()> + Send + Sync,
{
    async fn install(&self, scope: &mut Scope) -> anyhow::Result<()> {
        (self.f)(scope)
    }
}
