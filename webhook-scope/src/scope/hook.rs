//! Pre-validation hooks and the middleware that runs them.

use std::error::Error as _;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Rejection;

/// Snapshot of an incoming request as seen by hooks.
///
/// The body is fully buffered, so hooks can inspect it (e.g. to check a
/// signature) and the route handler still receives it intact afterwards.
#[derive(Clone)]
pub struct HookRequest {
    inner: Arc<HookRequestInner>,
}

struct HookRequestInner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl HookRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            inner: Arc::new(HookRequestInner {
                method,
                uri,
                headers,
                body,
            }),
        }
    }

    fn from_parts(parts: &Parts, body: Bytes) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
            body,
        )
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Deserialize the body as JSON.
    ///
    /// A malformed body is a `400 Bad Request` rejection.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Rejection> {
        serde_json::from_slice(&self.inner.body).map_err(|e| {
            Rejection::with_status(
                StatusCode::BAD_REQUEST,
                format!("invalid JSON body: {}", e),
            )
        })
    }
}

/// Request-time check that runs before a route handler.
///
/// Returning a [`Rejection`] ends the request with the rejection's status;
/// the handler never runs.
#[async_trait]
pub trait PreValidationHook: Send + Sync {
    async fn check(&self, request: &HookRequest) -> Result<(), Rejection>;
}

/// A [`PreValidationHook`] backed by an async closure.
pub struct HookFn<F> {
    f: F,
}

/// Build a hook from an async closure taking the request snapshot.
///
/// ```rust,ignore
/// scope.add_hook(hook_fn(|request: HookRequest| async move {
///     match request.header("x-token") {
///         Some("secret") => Ok(()),
///         _ => Err(Rejection::new("no good")),
///     }
/// }));
/// ```
pub fn hook_fn<F, Fut>(f: F) -> HookFn<F>
where
    F: Fn(HookRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Rejection>> + Send,
{
    HookFn { f }
}

#[async_trait]
impl<F, Fut> PreValidationHook for HookFn<F>
where
    F: Fn(HookRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Rejection>> + Send,
{
    async fn check(&self, request: &HookRequest) -> Result<(), Rejection> {
        (self.f)(request.clone()).await
    }
}

/// Resolved hook chain for one route.
#[derive(Clone)]
pub(crate) struct HookChain {
    pub(crate) route: Arc<str>,
    pub(crate) hooks: Arc<[Arc<dyn PreValidationHook>]>,
    pub(crate) body_limit: usize,
}

/// Middleware running a route's hook chain before its handler.
pub(crate) async fn run_hooks(
    State(chain): State<HookChain>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let declared_length = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared_length {
        if length > chain.body_limit {
            warn!(
                route = %chain.route,
                content_length = length,
                body_limit = chain.body_limit,
                "hook_body_too_large"
            );
            return Rejection::with_status(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body is too large",
            )
            .into_response();
        }
    }

    let bytes = match axum::body::to_bytes(body, chain.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let too_large = e
                .source()
                .is_some_and(|source| source.is::<LengthLimitError>());
            warn!(
                route = %chain.route,
                error = %e,
                too_large = too_large,
                "hook_body_read_failed"
            );
            let rejection = if too_large {
                Rejection::with_status(StatusCode::PAYLOAD_TOO_LARGE, "request body is too large")
            } else {
                Rejection::with_status(StatusCode::BAD_REQUEST, "failed to read request body")
            };
            return rejection.into_response();
        }
    };

    let hook_request = HookRequest::from_parts(&parts, bytes.clone());

    for hook in chain.hooks.iter() {
        if let Err(rejection) = hook.check(&hook_request).await {
            warn!(
                route = %chain.route,
                method = %parts.method,
                status = rejection.status().as_u16(),
                reason = %rejection,
                "pre_validation_rejected"
            );
            return rejection.into_response();
        }
    }

    debug!(
        route = %chain.route,
        hooks = chain.hooks.len(),
        "pre_validation_passed"
    );

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn json_request(body: &str) -> HookRequest {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        HookRequest::new(
            Method::POST,
            "/webhook?attempt=1".parse().unwrap(),
            headers,
            Bytes::from(body.to_string()),
        )
    }

    #[test]
    fn test_hook_request_accessors() {
        let request = json_request(r#"{"user":"admin"}"#);
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.path(), "/webhook");
        assert_eq!(request.uri().query(), Some("attempt=1"));
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("x-missing"), None);

        let body: Value = request.json().unwrap();
        assert_eq!(body["user"], "admin");
    }

    #[test]
    fn test_hook_request_invalid_json() {
        let request = json_request("{not json");
        let err = request.json::<Value>().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hook_fn() {
        let hook = hook_fn(|request: HookRequest| async move {
            let body: Value = request.json()?;
            if body["user"] != "admin" {
                return Err(Rejection::new("no good"));
            }
            Ok(())
        });

        assert!(hook.check(&json_request(r#"{"user":"admin"}"#)).await.is_ok());

        let err = hook.check(&json_request("{}")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "no good");
    }
}
