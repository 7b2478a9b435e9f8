//! Detail page fetching.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, REFERER, USER_AGENT};

use crate::services::ServiceError;

/// Mobile Safari user agent; mobile share pages only render state for it.
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";

const RETRY_BASE_DELAY_MS: u64 = 500;

/// Builds the request headers for Kuaishou pages.
///
/// The cookie is only attached when configured; `mobile` swaps the client's
/// desktop user agent for [`MOBILE_USER_AGENT`].
pub fn page_headers(cookie: &str, mobile: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://www.kuaishou.com/"));
    if mobile {
        headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_USER_AGENT));
    }
    if !cookie.is_empty() {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "KUAISHOU_COOKIE is not a valid header value"),
        }
    }
    headers
}

/// Sends a GET, retrying transport errors and 5xx responses up to `max_retry` times.
pub async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    max_retry: u32,
) -> Result<reqwest::Response, reqwest::Error> {
    let mut attempt = 0;
    loop {
        let result = client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match result {
            Ok(response) => return Ok(response),
            Err(e) if attempt < max_retry && is_retryable(&e) => {
                attempt += 1;
                tracing::warn!(url = %url, attempt, error = %e, "Request failed, retrying");
                tokio::time::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * u64::from(attempt)))
                    .await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_retryable(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request() || e.status().is_some_and(|s| s.is_server_error())
}

/// Fetches work detail pages.
#[derive(Debug, Clone)]
pub struct DetailPage {
    client: reqwest::Client,
    cookie: String,
    max_retry: u32,
}

impl DetailPage {
    pub const fn new(client: reqwest::Client, cookie: String, max_retry: u32) -> Self {
        Self {
            client,
            cookie,
            max_retry,
        }
    }

    /// Returns the page HTML, or `None` when the page stays unavailable.
    pub async fn fetch(&self, url: &str, web: bool) -> Result<Option<String>, ServiceError> {
        let headers = page_headers(&self.cookie, !web);

        let response = match get_with_retry(&self.client, url, headers, self.max_retry).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Detail page request failed");
                return Ok(None);
            }
        };

        let html = response.text().await?;
        if html.trim().is_empty() {
            tracing::warn!(url = %url, "Detail page returned an empty body");
            return Ok(None);
        }

        tracing::debug!(url = %url, bytes = html.len(), "Fetched detail page");
        Ok(Some(html))
    }
}
