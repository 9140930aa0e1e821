//! Configuration module for environment variable parsing.
//!
//! The `webhook-server` binary reads all of its configuration from
//! environment variables.

use std::env;
use tracing::warn;

use crate::host::DEFAULT_BODY_LIMIT;
use crate::webhooks::DEFAULT_NAMESPACE;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Maximum request body size buffered for verification
    pub body_limit: usize,

    /// Name under which the GitHub creators are exposed
    pub namespace: String,

    /// Route the GitHub receiver is mounted on
    pub github_webhook_path: String,

    /// Secret for `X-Hub-Signature-256` verification
    pub github_webhook_secret: Option<String>,

    /// Token used to create the repository hook
    pub github_token: Option<String>,

    /// Repository (`owner/repo`) the hook is created on
    pub github_repository: Option<String>,

    /// GitHub REST API base URL
    pub github_api_url: String,

    /// Events the created hook subscribes to
    pub github_events: Vec<String>,

    /// Public base URL GitHub reaches this server on
    pub public_url: Option<String>,

    /// Invoke the registered creators once the server is set up
    pub create_on_startup: bool,

    /// HTTP request timeout in milliseconds for upstream calls
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 3000),

            body_limit: parse_or("BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT),

            namespace: env::var("WEBHOOK_NAMESPACE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),

            github_webhook_path: env::var("GITHUB_WEBHOOK_PATH")
                .ok()
                .filter(|v| v.starts_with('/'))
                .unwrap_or_else(|| "/github".to_string()),

            github_webhook_secret: env::var("GITHUB_WEBHOOK_SECRET").ok(),

            github_token: env::var("GITHUB_TOKEN").ok(),

            github_repository: env::var("GITHUB_REPOSITORY").ok(),

            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),

            github_events: parse_csv("GITHUB_WEBHOOK_EVENTS")
                .filter(|events| !events.is_empty())
                .unwrap_or_else(|| vec!["push".to_string()]),

            public_url: env::var("PUBLIC_URL").ok(),

            create_on_startup: parse_bool("CREATE_WEBHOOKS_ON_STARTUP", false),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000),
        }
    }

    /// Callback URL for the GitHub hook, if a public URL is configured.
    pub fn github_callback_url(&self) -> Option<String> {
        self.public_url.as_ref().map(|base| {
            format!(
                "{}{}",
                base.trim_end_matches('/'),
                self.github_webhook_path
            )
        })
    }
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`).
fn parse_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                warn!(env_var = name, value = %raw, "Invalid flag, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or() {
        env::set_var("TEST_WS_PORT", "8081");
        assert_eq!(parse_or("TEST_WS_PORT", 3000u16), 8081);
        env::set_var("TEST_WS_PORT", "not-a-port");
        assert_eq!(parse_or("TEST_WS_PORT", 3000u16), 3000);
        env::remove_var("TEST_WS_PORT");
        assert_eq!(parse_or("TEST_WS_PORT", 3000u16), 3000);
    }

    #[test]
    fn test_parse_bool() {
        env::set_var("TEST_WS_FLAG", "TRUE");
        assert!(parse_bool("TEST_WS_FLAG", false));
        env::set_var("TEST_WS_FLAG", "0");
        assert!(!parse_bool("TEST_WS_FLAG", true));
        env::set_var("TEST_WS_FLAG", "maybe");
        assert!(parse_bool("TEST_WS_FLAG", true));
        env::remove_var("TEST_WS_FLAG");
        assert!(!parse_bool("TEST_WS_FLAG", false));
    }

    #[test]
    fn test_parse_csv() {
        env::set_var("TEST_WS_CSV", "push, pull_request, ,issues");
        let result = parse_csv("TEST_WS_CSV");
        assert_eq!(
            result,
            Some(vec![
                "push".to_string(),
                "pull_request".to_string(),
                "issues".to_string()
            ])
        );
        env::remove_var("TEST_WS_CSV");
    }

    #[test]
    fn test_github_callback_url() {
        let mut config = Config::from_env();
        config.github_webhook_path = "/github".to_string();

        config.public_url = None;
        assert_eq!(config.github_callback_url(), None);

        config.public_url = Some("https://hooks.example.com/".to_string());
        assert_eq!(
            config.github_callback_url().as_deref(),
            Some("https://hooks.example.com/github")
        );
    }
}
