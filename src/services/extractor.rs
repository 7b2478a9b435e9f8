//! Page state extraction.
//!
//! Desktop pages embed an Apollo cache as `window.__APOLLO_STATE__ = {...}`;
//! mobile share pages embed `window.INIT_STATE = {...}`. Both are parsed with
//! `serde_json` and reduced to an [`ExtractedDetail`].

use serde_json::Value;
use thiserror::Error;

const APOLLO_MARKER: &str = "window.__APOLLO_STATE__";
const INIT_STATE_MARKER: &str = "window.INIT_STATE";
const PHOTO_KEY_PREFIX: &str = "VisionVideoDetailPhoto:";
const AUTHOR_KEY_PREFIX: &str = "VisionVideoDetailAuthor:";

/// Markers of the login / verification wall served instead of a work page.
const LOGIN_MARKERS: &[&str] = &[
    "passport.kuaishou.com/pc/account/login",
    "请登录",
    "登录后查看",
    "captcha.js",
    "验证码",
];

/// Errors raised while extracting page state.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no embedded page state found")]
    StateNotFound,

    #[error("embedded page state is not valid JSON: {0}")]
    InvalidState(#[from] serde_json::Error),

    #[error("work {0} not present in page state")]
    DetailMissing(String),

    #[error("page requires login")]
    LoginRequired,
}

/// Kind of work as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoType {
    #[default]
    Video,
    /// Image set
    Atlas,
}

impl PhotoType {
    fn from_raw(raw: &str) -> Self {
        if raw.to_ascii_uppercase().contains("ATLAS") || raw == "图片" {
            Self::Atlas
        } else {
            Self::Video
        }
    }
}

/// Raw work fields pulled out of a page.
///
/// Counters and duration stay as JSON values because Kuaishou mixes numbers
/// and display strings (`"1.2万"`).
#[derive(Debug, Clone, Default)]
pub struct ExtractedDetail {
    pub detail_id: String,
    pub caption: String,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar: String,
    pub photo_type: PhotoType,
    pub downloads: Vec<String>,
    pub cover_url: String,
    pub like_count: Value,
    pub comment_count: Value,
    pub share_count: Value,
    pub view_count: Value,
    pub duration: Value,
    pub width: u64,
    pub height: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
}

/// Extracts work details from page HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    /// Extracts the work `detail_id` from `html`.
    ///
    /// `web` selects the desktop Apollo state first; the other format is
    /// tried as a fallback since share links may land on either page kind.
    pub fn run(html: &str, detail_id: &str, web: bool) -> Result<ExtractedDetail, ExtractError> {
        let order: [(&str, fn(&Value, &str) -> Option<ExtractedDetail>); 2] = if web {
            [(APOLLO_MARKER, from_apollo), (INIT_STATE_MARKER, from_init_state)]
        } else {
            [(INIT_STATE_MARKER, from_init_state), (APOLLO_MARKER, from_apollo)]
        };

        let mut saw_state = false;
        let mut parse_error = None;
        for (marker, extract) in order {
            let Some(raw) = state_json(html, marker) else {
                continue;
            };
            saw_state = true;
            let state: Value = match serde_json::from_str(raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(marker, error = %e, "Page state is not valid JSON");
                    parse_error = Some(e);
                    continue;
                }
            };
            if let Some(detail) = extract(&state, detail_id) {
                return Ok(detail);
            }
        }

        if LOGIN_MARKERS.iter().any(|m| html.contains(m)) {
            return Err(ExtractError::LoginRequired);
        }
        match (parse_error, saw_state) {
            (Some(e), _) => Err(ExtractError::InvalidState(e)),
            (None, true) => Err(ExtractError::DetailMissing(detail_id.to_string())),
            (None, false) => Err(ExtractError::StateNotFound),
        }
    }
}

/// Returns the JSON object assigned right after `marker`, if any.
fn state_json<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let after = &html[html.find(marker)? + marker.len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    balanced_object(after)
}

/// Returns the leading `{...}` of `s`, honoring string literals and escapes.
fn balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn text(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn raw(v: &Value, key: &str) -> Value {
    v.get(key).cloned().unwrap_or(Value::Null)
}

fn first_url(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_array)
        .and_then(|list| list.iter().find_map(|item| item.get("url")?.as_str()))
        .unwrap_or_default()
        .to_string()
}

/// Desktop Apollo cache: photo and author are normalized entries keyed by type and id.
fn from_apollo(state: &Value, detail_id: &str) -> Option<ExtractedDetail> {
    let client = state.get("defaultClient").unwrap_or(state).as_object()?;

    // The Apollo cache may hold related works too; only the requested one counts
    let photo = client.get(&format!("{PHOTO_KEY_PREFIX}{detail_id}"))?;

    let author_ref = client
        .iter()
        .filter(|(k, _)| k.contains("visionVideoDetail"))
        .find_map(|(_, v)| v.get("author")?.get("id")?.as_str());
    let author = author_ref
        .and_then(|key| client.get(key))
        .or_else(|| {
            client
                .iter()
                .find(|(k, _)| k.starts_with(AUTHOR_KEY_PREFIX))
                .map(|(_, v)| v)
        })
        .cloned()
        .unwrap_or(Value::Null);

    let representation = photo
        .pointer("/manifest/adaptationSet/0/representation/0")
        .cloned()
        .unwrap_or(Value::Null);

    let video_url = text(photo, "photoUrl");
    let id = text(photo, "id");

    Some(ExtractedDetail {
        detail_id: if id.is_empty() { detail_id.to_string() } else { id },
        caption: text(photo, "caption"),
        author_id: text(&author, "id"),
        author_name: text(&author, "name"),
        author_avatar: text(&author, "headerUrl"),
        photo_type: PhotoType::Video,
        downloads: if video_url.is_empty() { Vec::new() } else { vec![video_url] },
        cover_url: text(photo, "coverUrl"),
        like_count: photo
            .get("realLikeCount")
            .or_else(|| photo.get("likeCount"))
            .cloned()
            .unwrap_or(Value::Null),
        comment_count: raw(photo, "commentCount"),
        share_count: raw(photo, "shareCount"),
        view_count: raw(photo, "viewCount"),
        duration: raw(photo, "duration"),
        width: representation.get("width").and_then(Value::as_u64).unwrap_or(0),
        height: representation.get("height").and_then(Value::as_u64).unwrap_or(0),
        timestamp: photo.get("timestamp").and_then(Value::as_i64),
    })
}

/// Mobile share page: one top-level entry holds `{"photo": {...}}`.
fn from_init_state(state: &Value, detail_id: &str) -> Option<ExtractedDetail> {
    let entries = state.as_object()?;
    let photos: Vec<&Value> = entries
        .values()
        .filter_map(|v| v.get("photo"))
        .filter(|p| p.is_object())
        .collect();

    // Share pages carry a single work whose id may differ from the link's
    // (e.g. a reposted id), so fall back to the only entry present.
    let photo = match photos.iter().find(|p| text(p, "photoId") == detail_id) {
        Some(photo) => *photo,
        None => match photos.as_slice() {
            [only] => {
                tracing::warn!(
                    requested = %detail_id,
                    found = %text(only, "photoId"),
                    "Requested work not on page, using the page's only work"
                );
                *only
            }
            _ => return None,
        },
    };

    let photo_type = PhotoType::from_raw(&text(photo, "photoType"));
    let downloads = match photo_type {
        PhotoType::Atlas => atlas_urls(photo),
        PhotoType::Video => {
            let url = first_url(photo, "mainMvUrls");
            if url.is_empty() { Vec::new() } else { vec![url] }
        }
    };

    let ext = photo.get("ext_params").cloned().unwrap_or(Value::Null);
    let id = text(photo, "photoId");

    Some(ExtractedDetail {
        detail_id: if id.is_empty() { detail_id.to_string() } else { id },
        caption: text(photo, "caption"),
        author_id: text(photo, "userId"),
        author_name: text(photo, "userName"),
        author_avatar: text(photo, "headUrl"),
        photo_type,
        downloads,
        cover_url: first_url(photo, "coverUrls"),
        like_count: raw(photo, "likeCount"),
        comment_count: raw(photo, "commentCount"),
        share_count: raw(photo, "shareCount"),
        view_count: raw(photo, "viewCount"),
        duration: raw(photo, "duration"),
        width: ext.get("w").and_then(Value::as_u64).unwrap_or(0),
        height: ext.get("h").and_then(Value::as_u64).unwrap_or(0),
        timestamp: photo.get("timestamp").and_then(Value::as_i64),
    })
}

/// Image URLs of an atlas: `https://<cdn><path>` for every listed path.
fn atlas_urls(photo: &Value) -> Vec<String> {
    let Some(atlas) = photo.pointer("/ext_params/atlas") else {
        return Vec::new();
    };
    let Some(cdn) = atlas
        .get("cdn")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(Value::as_str)
    else {
        return Vec::new();
    };

    atlas
        .get("list")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(|path| format!("https://{cdn}{path}"))
                .collect()
        })
        .unwrap_or_default()
}
