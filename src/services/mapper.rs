//! Maps extracted page details onto the public [`VideoSchema`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{AuthorSchema, MediaKind, MediaSchema, StatisticsSchema, VideoSchema, PLATFORM};
use crate::services::extractor::{ExtractedDetail, PhotoType};
use crate::utils::{count_from_value, duration_from_value, format_publish_time};

static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([^#\s@]+)").expect("valid hashtag regex"));

/// Hashtags in caption order, without duplicates or the leading `#`.
pub fn hashtags(caption: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in HASHTAG_RE.captures_iter(caption) {
        let tag = cap[1].to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Builds the normalized schema for `detail`, reporting `original_url` as given.
pub fn map_detail(detail: &ExtractedDetail, original_url: &str) -> VideoSchema {
    let (kind, video_url, image_urls) = match (detail.photo_type, detail.downloads.first()) {
        (PhotoType::Atlas, Some(_)) => (MediaKind::Image, String::new(), detail.downloads.clone()),
        (PhotoType::Video, Some(first)) => (MediaKind::Video, first.clone(), Vec::new()),
        (_, None) => (MediaKind::Video, String::new(), Vec::new()),
    };

    VideoSchema {
        platform: PLATFORM.to_string(),
        video_id: detail.detail_id.clone(),
        original_url: original_url.to_string(),
        title: detail.caption.clone(),
        description: detail.caption.clone(),
        content: String::new(),
        tags: hashtags(&detail.caption),
        kind,
        author: AuthorSchema {
            id: detail.author_id.clone(),
            nickname: detail.author_name.clone(),
            avatar: detail.author_avatar.clone(),
            ..AuthorSchema::default()
        },
        statistics: StatisticsSchema {
            like_count: count_from_value(&detail.like_count).unwrap_or(0),
            comment_count: count_from_value(&detail.comment_count).unwrap_or(0),
            share_count: count_from_value(&detail.share_count).unwrap_or(0),
            collect_count: 0,
            play_count: count_from_value(&detail.view_count).unwrap_or(0),
        },
        media: MediaSchema {
            cover_url: detail.cover_url.clone(),
            video_url,
            image_urls,
            duration: duration_from_value(&detail.duration).unwrap_or(0),
            width: detail.width,
            height: detail.height,
            quality: None,
        },
        publish_time: detail.timestamp.and_then(format_publish_time),
        update_time: None,
    }
}
