//! Share link examination.
//!
//! Finds Kuaishou links in free-form share text, follows short links to
//! their detail page and pulls the work id out of detail URLs.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::services::page::{get_with_retry, page_headers};
use crate::services::ServiceError;

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https?://(?:[A-Za-z0-9-]+\.)*(?:kuaishou\.com|chenzhongtech\.com|gifshow\.com)(?:/[A-Za-z0-9\-._~:/?#\[\]@!$&()*+,;=%]*)?",
    )
    .expect("valid link regex")
});

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid id regex"));

/// Identifiers carried by a detail URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParams {
    /// Desktop (`www.kuaishou.com/short-video/..`) page rather than a mobile share page.
    pub web: bool,
    pub user_id: Option<String>,
    pub detail_id: String,
}

/// Returns every Kuaishou link in `text`, in order, without duplicates.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for m in LINK_RE.find_iter(text) {
        let link = m.as_str().trim_end_matches(['.', ',', ')', ']']).to_string();
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

/// Whether `link` is a short share link that must be resolved by redirect.
pub fn is_short_link(link: &str) -> bool {
    let Ok(parsed) = Url::parse(link) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default();
    let path = parsed.path();

    host == "v.kuaishou.com"
        || ((host == "www.kuaishou.com" || host == "kuaishou.com") && path.starts_with("/f/"))
}

/// Pulls the work id (and the author id when present) out of a detail URL.
pub fn extract_params(link: &str) -> Result<LinkParams, ServiceError> {
    let parsed = Url::parse(link).map_err(|_| ServiceError::NoDetailId)?;
    let host = parsed.host_str().unwrap_or_default();
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let query_value = |key: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    };

    let web_host = host.ends_with("kuaishou.com") && host != "v.kuaishou.com";

    let (web, path_user, path_detail) = match segments.as_slice() {
        ["short-video", id, ..] if web_host => (true, None, Some(*id)),
        ["u", user, id, ..] if host == "live.kuaishou.com" => (true, Some(*user), Some(*id)),
        ["fw", "photo" | "long-video", id, ..] => (false, None, Some(*id)),
        ["photo", user, id, ..] => (false, Some(*user), Some(*id)),
        _ => (web_host, None, None),
    };

    let detail_id = path_detail
        .map(str::to_string)
        .or_else(|| query_value("photoId"))
        .filter(|id| ID_RE.is_match(id))
        .ok_or(ServiceError::NoDetailId)?;

    let user_id = path_user
        .map(str::to_string)
        .or_else(|| query_value("authorId"))
        .or_else(|| query_value("userId"));

    Ok(LinkParams {
        web,
        user_id,
        detail_id,
    })
}

/// Resolves share text into detail page URLs.
#[derive(Debug, Clone)]
pub struct Examiner {
    client: reqwest::Client,
    cookie: String,
    max_retry: u32,
}

impl Examiner {
    pub const fn new(client: reqwest::Client, cookie: String, max_retry: u32) -> Self {
        Self {
            client,
            cookie,
            max_retry,
        }
    }

    /// Returns the detail URL for every link found in `text`.
    ///
    /// Short links that fail to resolve are skipped.
    pub async fn resolve(&self, text: &str) -> Vec<String> {
        let mut resolved = Vec::new();
        for link in extract_links(text) {
            if !is_short_link(&link) {
                resolved.push(link);
                continue;
            }

            match self.follow_redirects(&link).await {
                Ok(target) => {
                    tracing::debug!(link = %link, target = %target, "Resolved share link");
                    resolved.push(target);
                }
                Err(e) => {
                    tracing::warn!(link = %link, error = %e, "Failed to resolve share link");
                }
            }
        }
        resolved
    }

    async fn follow_redirects(&self, link: &str) -> Result<String, reqwest::Error> {
        let headers = page_headers(&self.cookie, false);
        let response = get_with_retry(&self.client, link, headers, self.max_retry).await?;
        Ok(response.url().to_string())
    }
}
