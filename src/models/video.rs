//! Video model module.
//!
//! The normalized shape returned by `POST /info`. Every field has a default so
//! partially extracted works still serialize to a complete document.

use serde::{Deserialize, Serialize};

/// Platform identifier reported in every schema.
pub const PLATFORM: &str = "kuaishou";

/// Kind of work behind a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Image,
}

/// Author block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSchema {
    pub id: String,
    pub sec_uid: String,
    pub nickname: String,
    pub avatar: String,
    pub signature: String,
    pub verified: bool,
    pub follower_count: u64,
    pub following_count: u64,
    pub region: String,
}

/// Engagement counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSchema {
    pub like_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    pub collect_count: u64,
    pub play_count: u64,
}

/// Media locations and dimensions.
///
/// For a video only `video_url` is set; for an image set only `image_urls`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSchema {
    pub cover_url: String,
    pub video_url: String,
    pub image_urls: Vec<String>,
    /// Seconds
    pub duration: u64,
    pub width: u64,
    pub height: u64,
    pub quality: Option<String>,
}

/// Normalized metadata for a single Kuaishou work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSchema {
    pub platform: String,
    pub video_id: String,
    pub original_url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub author: AuthorSchema,
    pub statistics: StatisticsSchema,
    pub media: MediaSchema,
    /// `YYYY-MM-DD_HH:MM:SS`
    pub publish_time: Option<String>,
    pub update_time: Option<String>,
}

impl Default for VideoSchema {
    fn default() -> Self {
        Self {
            platform: PLATFORM.to_string(),
            video_id: String::new(),
            original_url: String::new(),
            title: String::new(),
            description: String::new(),
            content: String::new(),
            tags: Vec::new(),
            kind: MediaKind::Video,
            author: AuthorSchema::default(),
            statistics: StatisticsSchema::default(),
            media: MediaSchema::default(),
            publish_time: None,
            update_time: None,
        }
    }
}

impl VideoSchema {
    /// All downloadable media URLs in order (video first, then images).
    pub fn media_urls(&self) -> Vec<&str> {
        let mut urls = Vec::new();
        if !self.media.video_url.is_empty() {
            urls.push(self.media.video_url.as_str());
        }
        urls.extend(
            self.media
                .image_urls
                .iter()
                .filter(|u| !u.is_empty())
                .map(String::as_str),
        );
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_platform() {
        let schema = VideoSchema::default();
        assert_eq!(schema.platform, "kuaishou");
        assert_eq!(schema.kind, MediaKind::Video);
    }

    #[test]
    fn test_schema_serializes_type_field() {
        let schema = VideoSchema {
            kind: MediaKind::Image,
            ..VideoSchema::default()
        };
        let json = serde_json::to_value(&schema).unwrap();

        assert_eq!(json["type"], "image");
        assert!(json.get("kind").is_none());
        assert!(json["update_time"].is_null());
        assert!(json["media"]["quality"].is_null());
        assert_eq!(json["statistics"]["collect_count"], 0);
    }

    #[test]
    fn test_schema_messagepack_roundtrip() {
        let schema = VideoSchema {
            video_id: "3xabc".to_string(),
            tags: vec!["快手".to_string()],
            publish_time: Some("2024-01-02_11:04:05".to_string()),
            ..VideoSchema::default()
        };

        let bytes = rmp_serde::to_vec(&schema).unwrap();
        let decoded: VideoSchema = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, schema);
    }

    #[test]
    fn test_media_urls_video() {
        let mut schema = VideoSchema::default();
        schema.media.video_url = "https://v.example/1.mp4".to_string();
        assert_eq!(schema.media_urls(), vec!["https://v.example/1.mp4"]);
    }

    #[test]
    fn test_media_urls_images_skip_empty() {
        let mut schema = VideoSchema::default();
        schema.media.image_urls = vec![
            "https://p.example/1.jpg".to_string(),
            String::new(),
            "https://p.example/2.jpg".to_string(),
        ];
        assert_eq!(schema.media_urls().len(), 2);
    }
}
