//! GitHub REST client for creating repository webhooks.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::webhooks::Creator;

const API_VERSION: &str = "2022-11-28";

/// What the created hook should deliver, and where.
#[derive(Debug, Clone)]
pub struct HookSpec {
    /// Public URL GitHub will POST deliveries to
    pub url: String,
    /// Secret GitHub signs deliveries with
    pub secret: Option<String>,
    /// Events to subscribe to
    pub events: Vec<String>,
    pub active: bool,
}

#[derive(Serialize)]
struct CreateHookRequest<'a> {
    name: &'static str,
    active: bool,
    events: &'a [String],
    config: HookConfig<'a>,
}

#[derive(Serialize)]
struct HookConfig<'a> {
    url: &'a str,
    content_type: &'static str,
    insecure_ssl: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

/// Minimal GitHub API client.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: Url,
    token: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_url = Url::parse(api_url).context("Invalid GitHub API URL")?;
        if api_url.cannot_be_a_base() {
            return Err(anyhow!("GitHub API URL cannot be a base: {}", api_url));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("webhook-scope/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_url,
            token: token.into(),
        })
    }

    /// `{api}/repos/{owner}/{repo}/hooks`
    fn hooks_url(&self, repository: &str) -> Result<Url> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .with_context(|| format!("Repository must be `owner/repo`, got `{}`", repository))?;

        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("GitHub API URL cannot be a base"))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "hooks"]);
        Ok(url)
    }

    /// Create a repository webhook and return GitHub's description of it.
    ///
    /// Non-success statuses are errors. Nothing is retried.
    pub async fn create_repository_hook(
        &self,
        repository: &str,
        spec: &HookSpec,
    ) -> Result<Value> {
        let url = self.hooks_url(repository)?;
        let request = CreateHookRequest {
            name: "web",
            active: spec.active,
            events: &spec.events,
            config: HookConfig {
                url: &spec.url,
                content_type: "json",
                insecure_ssl: "0",
                secret: spec.secret.as_deref(),
            },
        };

        info!(
            repository = %repository,
            callback_url = %spec.url,
            events = ?spec.events,
            "github_hook_create_start"
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to reach GitHub")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                repository = %repository,
                status = status.as_u16(),
                body_preview = %body.chars().take(200).collect::<String>(),
                "github_hook_create_failed"
            );
            return Err(anyhow!("GitHub returned {} creating hook: {}", status, body));
        }

        let created: Value = response
            .json()
            .await
            .context("Failed to parse GitHub response")?;

        info!(
            repository = %repository,
            hook_id = ?created.get("id"),
            "github_hook_created"
        );

        Ok(created)
    }
}

/// Creator registering a repository webhook with GitHub.
pub struct CreateRepositoryHook {
    client: GithubClient,
    repository: String,
    spec: HookSpec,
}

impl CreateRepositoryHook {
    pub fn new(client: GithubClient, repository: impl Into<String>, spec: HookSpec) -> Self {
        Self {
            client,
            repository: repository.into(),
            spec,
        }
    }
}

#[async_trait]
impl Creator for CreateRepositoryHook {
    async fn create(&self) -> Result<Value> {
        self.client
            .create_repository_hook(&self.repository, &self.spec)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn create_hook(
        Path((owner, repo)): Path<(String, String)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer test-token");
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Bad credentials" })),
            );
        }
        if repo == "locked" {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "Validation Failed" })),
            );
        }

        (
            StatusCode::CREATED,
            Json(json!({
                "id": 42,
                "name": body["name"],
                "active": body["active"],
                "events": body["events"],
                "config": body["config"],
                "url": format!("https://api.github.com/repos/{owner}/{repo}/hooks/42"),
            })),
        )
    }

    /// Serve a stand-in for the GitHub API on an ephemeral port.
    async fn fake_github() -> String {
        let app = Router::new().route("/repos/:owner/:repo/hooks", post(create_hook));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn spec() -> HookSpec {
        HookSpec {
            url: "https://hooks.example.com/github".to_string(),
            secret: Some("s3cret".to_string()),
            events: vec!["push".to_string(), "pull_request".to_string()],
            active: true,
        }
    }

    fn client(api_url: &str, token: &str) -> GithubClient {
        GithubClient::new(api_url, token, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_hooks_url() {
        let github = client("https://api.github.com", "t");
        assert_eq!(
            github.hooks_url("acme/widgets").unwrap().as_str(),
            "https://api.github.com/repos/acme/widgets/hooks"
        );

        let enterprise = client("https://ghe.example.com/api/v3/", "t");
        assert_eq!(
            enterprise.hooks_url("acme/widgets").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/acme/widgets/hooks"
        );
    }

    #[test]
    fn test_hooks_url_rejects_bad_repository() {
        let github = client("https://api.github.com", "t");
        for repository in ["widgets", "/widgets", "acme/", "acme/widgets/extra"] {
            assert!(github.hooks_url(repository).is_err(), "{}", repository);
        }
    }

    #[test]
    fn test_invalid_api_url() {
        assert!(GithubClient::new("not a url", "t", Duration::from_secs(1)).is_err());
        assert!(GithubClient::new("mailto:ops@example.com", "t", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_request_omits_missing_secret() {
        let events = vec!["push".to_string()];
        let request = CreateHookRequest {
            name: "web",
            active: true,
            events: &events,
            config: HookConfig {
                url: "https://hooks.example.com/github",
                content_type: "json",
                insecure_ssl: "0",
                secret: None,
            },
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["config"]["content_type"], "json");
        assert!(body["config"].get("secret").is_none());
    }

    #[tokio::test]
    async fn test_creator_creates_hook() {
        let api_url = fake_github().await;
        let creator =
            CreateRepositoryHook::new(client(&api_url, "test-token"), "acme/widgets", spec());

        let created = creator.create().await.unwrap();
        assert_eq!(created["id"], 42);
        assert_eq!(created["name"], "web");
        assert_eq!(created["events"], json!(["push", "pull_request"]));
        assert_eq!(created["config"]["url"], "https://hooks.example.com/github");
        assert_eq!(created["config"]["secret"], "s3cret");
    }

    #[tokio::test]
    async fn test_creator_surfaces_upstream_errors() {
        let api_url = fake_github().await;

        let locked =
            CreateRepositoryHook::new(client(&api_url, "test-token"), "acme/locked", spec());
        let err = locked.create().await.unwrap_err();
        assert!(err.to_string().contains("422"), "{}", err);

        let unauthorized =
            CreateRepositoryHook::new(client(&api_url, "wrong-token"), "acme/widgets", spec());
        let err = unauthorized.create().await.unwrap_err();
        assert!(err.to_string().contains("401"), "{}", err);
    }
}
