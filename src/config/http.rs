//! Shared HTTP client configuration module.

use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};

use crate::config::env::AppConfig;
use crate::error::{AppError, AppResult};

static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

/// Builds a `reqwest::Client` from the given configuration.
///
/// The client follows redirects (share links resolve through them), keeps a
/// connection pool per host and routes through `KS_PROXY` when set.
pub fn build_http_client(config: &AppConfig) -> AppResult<reqwest::Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );

    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.ks_timeout_secs))
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers(default_headers);

    if let Some(proxy_url) = &config.ks_proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => {
                tracing::info!(proxy = %proxy_url, "Routing Kuaishou traffic through proxy");
                builder = builder.proxy(proxy);
            }
            Err(e) => {
                tracing::warn!(proxy = %proxy_url, error = %e, "Invalid proxy URL, ignoring");
            }
        }
    }

    builder
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))
}

/// Initializes the shared HTTP client.
///
/// Subsequent calls return a clone of the same client.
pub fn init_http_client(config: &AppConfig) -> AppResult<reqwest::Client> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = build_http_client(config)?;
    HTTP_CLIENT.set(client.clone()).ok();
    tracing::info!(
        timeout_secs = config.ks_timeout_secs,
        "Shared HTTP client created"
    );

    Ok(client)
}
