//! Creator registry.
//!
//! A creator performs the out-of-band half of a webhook: registering it with
//! the upstream service (e.g. creating a GitHub repository hook). The
//! registry only stores creators; invoking them, and handling whatever they
//! return, is up to the caller.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// Async action registering a webhook with its upstream service.
#[async_trait]
pub trait Creator: Send + Sync {
    async fn create(&self) -> anyhow::Result<Value>;
}

/// A [`Creator`] backed by an async closure.
pub struct CreatorFn<F> {
    f: F,
}

/// Build a creator from an async closure.
pub fn creator_fn<F, Fut>(f: F) -> CreatorFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    CreatorFn { f }
}

#[async_trait]
impl<F, Fut> Creator for CreatorFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn create(&self) -> anyhow::Result<Value> {
        (self.f)().await
    }
}

/// Creators of one registration, keyed by webhook path.
///
/// Built once and read-only afterwards.
#[derive(Clone, Default)]
pub struct CreatorRegistry {
    creators: HashMap<String, Arc<dyn Creator>>,
}

impl CreatorRegistry {
    pub(crate) fn insert(&mut self, path: String, creator: Arc<dyn Creator>) {
        self.creators.insert(path, creator);
    }

    /// Creator registered for `path`, if the webhook supplied one.
    pub fn get(&self, path: &str) -> Option<Arc<dyn Creator>> {
        self.creators.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.creators.contains_key(path)
    }

    /// Paths with a creator, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.creators.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

impl fmt::Debug for CreatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatorRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = CreatorRegistry::default();
        registry.insert(
            "/a".to_string(),
            Arc::new(creator_fn(|| async { anyhow::Ok(json!("created-a")) })),
        );

        assert!(registry.contains("/a"));
        assert!(!registry.contains("/b"));
        assert!(registry.get("/b").is_none());
        assert_eq!(registry.len(), 1);

        let created = registry.get("/a").unwrap().create().await.unwrap();
        assert_eq!(created, json!("created-a"));
    }

    #[tokio::test]
    async fn test_creator_errors_reach_the_caller() {
        let creator =
            creator_fn(|| async { Err::<Value, _>(anyhow::anyhow!("upstream unavailable")) });

        let err = creator.create().await.unwrap_err();
        assert_eq!(err.to_string(), "upstream unavailable");
    }

    #[test]
    fn test_empty_registry() {
        let registry = CreatorRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.paths().is_empty());
        assert_eq!(format!("{:?}", registry), "CreatorRegistry { paths: [] }");
    }
}
