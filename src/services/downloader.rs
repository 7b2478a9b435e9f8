//! Media downloads.
//!
//! Files stream into the temp directory as `<name>.<uuid>.part` and are moved
//! into the download directory once complete. A semaphore caps concurrent downloads.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::models::{MediaKind, VideoSchema};
use crate::services::page::get_with_retry;
use crate::services::ServiceError;
use crate::utils::filter_name;

/// Streams work media to disk.
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: reqwest::Client,
    download_dir: PathBuf,
    temp_dir: PathBuf,
    chunk_size: usize,
    max_retry: u32,
    permits: Arc<Semaphore>,
}

impl MediaDownloader {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            download_dir: config.download_path.clone(),
            temp_dir: config.temp_path.clone(),
            chunk_size: config.ks_chunk_size,
            max_retry: config.ks_max_retry,
            permits: Arc::new(Semaphore::new(config.ks_max_workers)),
        }
    }

    /// File stem `<publish time>_<author>_<caption>`, falling back to the work id.
    pub fn file_stem(schema: &VideoSchema) -> String {
        let base = format!(
            "{}_{}_{}",
            schema.publish_time.as_deref().unwrap_or("unknown_time"),
            schema.author.nickname,
            schema.title
        );
        let fallback = if schema.video_id.is_empty() {
            "kuaishou"
        } else {
            schema.video_id.as_str()
        };
        filter_name(&base, fallback)
    }

    /// Downloads every media file of `schema` and returns the final paths.
    pub async fn download(&self, schema: &VideoSchema) -> Result<Vec<PathBuf>, ServiceError> {
        let urls = schema.media_urls();
        if urls.is_empty() {
            return Err(ServiceError::ExtractionFailed(
                "work has no downloadable media".to_string(),
            ));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| io::Error::other("download queue closed"))?;

        fs::create_dir_all(&self.download_dir).await?;
        fs::create_dir_all(&self.temp_dir).await?;

        let stem = Self::file_stem(schema);
        let multiple = urls.len() > 1;
        let mut paths = Vec::with_capacity(urls.len());

        for (index, url) in urls.into_iter().enumerate() {
            let ext = file_extension(url, schema.kind);
            let name = if multiple {
                format!("{stem}_{}.{ext}", index + 1)
            } else {
                format!("{stem}.{ext}")
            };
            let dest = self.download_dir.join(&name);

            if is_complete(&dest).await {
                tracing::info!(path = %dest.display(), "File already downloaded, skipping");
            } else {
                // Concurrent tasks for the same work must not share a part file
                let part = self
                    .temp_dir
                    .join(format!("{name}.{}.part", uuid::Uuid::new_v4().simple()));
                self.fetch_to(url, &part).await?;
                move_file(&part, &dest).await?;
                tracing::info!(path = %dest.display(), "Download finished");
            }
            paths.push(dest);
        }

        Ok(paths)
    }

    async fn fetch_to(&self, url: &str, part: &Path) -> Result<(), ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.kuaishou.com/"));

        let response = get_with_retry(&self.client, url, headers, self.max_retry).await?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, File::create(part).await?);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => writer.write_all(&bytes).await?,
                Err(e) => {
                    drop(writer);
                    fs::remove_file(part).await.ok();
                    return Err(e.into());
                }
            }
        }

        writer.flush().await?;
        Ok(())
    }
}

/// Extension from the URL path, or a default per media kind.
fn file_extension(url: &str, kind: MediaKind) -> &'static str {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_default();

    match Path::new(&path).extension().and_then(|e| e.to_str()) {
        Some("mp4") => "mp4",
        Some("jpg" | "jpeg") => "jpg",
        Some("webp") => "webp",
        Some("png") => "png",
        _ => match kind {
            MediaKind::Video => "mp4",
            MediaKind::Image => "jpg",
        },
    }
}

async fn is_complete(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Renames `from` to `to`, copying when they sit on different filesystems.
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to).await?;
    fs::remove_file(from).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> AppConfig {
        let base = std::env::temp_dir().join(format!("ks-dl-{}", uuid::Uuid::new_v4()));
        let mut config = AppConfig::from_env();
        config.download_path = base.join("out");
        config.temp_path = base.join("tmp");
        config.ks_max_retry = 0;
        config
    }

    #[test]
    fn test_file_stem_from_metadata() {
        let mut schema = VideoSchema {
            video_id: "3xabc".to_string(),
            title: "海边 / 散步?".to_string(),
            publish_time: Some("2024-01-02_11:04:05".to_string()),
            ..VideoSchema::default()
        };
        schema.author.nickname = "阿海".to_string();

        assert_eq!(
            MediaDownloader::file_stem(&schema),
            "2024-01-02_110405_阿海_海边_散步"
        );
    }

    #[test]
    fn test_file_stem_without_publish_time() {
        let schema = VideoSchema {
            video_id: "3xabc".to_string(),
            ..VideoSchema::default()
        };
        assert_eq!(MediaDownloader::file_stem(&schema), "unknown_time");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("https://v.kwaicdn.com/a/b.MP4?x=1", MediaKind::Video), "mp4");
        assert_eq!(file_extension("https://p.yximgs.com/1.webp", MediaKind::Image), "webp");
        assert_eq!(file_extension("https://p.yximgs.com/1.jpeg", MediaKind::Image), "jpg");
        assert_eq!(file_extension("https://v.kwaicdn.com/stream", MediaKind::Video), "mp4");
        assert_eq!(file_extension("https://p.yximgs.com/img", MediaKind::Image), "jpg");
    }

    #[tokio::test]
    async fn test_download_without_media_fails() {
        let config = temp_config();
        let downloader = MediaDownloader::new(reqwest::Client::new(), &config);

        let result = downloader.download(&VideoSchema::default()).await;
        assert!(matches!(result, Err(ServiceError::ExtractionFailed(_))));
    }

    #[tokio::test]
    async fn test_download_reuses_existing_file() {
        let config = temp_config();
        let downloader = MediaDownloader::new(reqwest::Client::new(), &config);

        let mut schema = VideoSchema {
            video_id: "3xcached".to_string(),
            title: "cached".to_string(),
            publish_time: Some("2024-01-02_11:04:05".to_string()),
            ..VideoSchema::default()
        };
        schema.media.video_url = "http://127.0.0.1:9/never-fetched.mp4".to_string();

        std::fs::create_dir_all(&config.download_path).unwrap();
        let existing = config
            .download_path
            .join(format!("{}.mp4", MediaDownloader::file_stem(&schema)));
        std::fs::write(&existing, b"data").unwrap();

        let paths = downloader.download(&schema).await.unwrap();
        assert_eq!(paths, vec![existing]);
    }

    const MEDIA_LEN: usize = 200_000;

    /// Serves `/media.mp4` as a slow chunked body so concurrent downloads overlap.
    async fn spawn_media_server() -> std::net::SocketAddr {
        use axum::{body::Body, routing::get, Router};
        use futures_util::stream;

        let app = Router::new()
            .route(
                "/media.mp4",
                get(|| async {
                    let chunks = stream::iter(0..20).then(|_| async {
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        Ok::<_, io::Error>(vec![7u8; MEDIA_LEN / 20])
                    });
                    Body::from_stream(chunks)
                }),
            )
            .route(
                "/missing.mp4",
                get(|| async { axum::http::StatusCode::NOT_FOUND }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn media_schema(url: String) -> VideoSchema {
        let mut schema = VideoSchema {
            video_id: "3xstream".to_string(),
            title: "stream".to_string(),
            publish_time: Some("2024-01-02_11:04:05".to_string()),
            ..VideoSchema::default()
        };
        schema.media.video_url = url;
        schema
    }

    #[tokio::test]
    async fn test_download_streams_into_place() {
        let addr = spawn_media_server().await;
        let config = temp_config();
        let downloader = MediaDownloader::new(reqwest::Client::new(), &config);

        let schema = media_schema(format!("http://{addr}/media.mp4"));
        let paths = downloader.download(&schema).await.unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(std::fs::read(&paths[0]).unwrap().len(), MEDIA_LEN);
        assert_eq!(
            paths[0],
            config
                .download_path
                .join(format!("{}.mp4", MediaDownloader::file_stem(&schema)))
        );

        // No part files are left behind
        let leftovers = std::fs::read_dir(&config.temp_path).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_concurrent_downloads_of_same_work() {
        let addr = spawn_media_server().await;
        let config = temp_config();
        let downloader = MediaDownloader::new(reqwest::Client::new(), &config);

        let schema = media_schema(format!("http://{addr}/media.mp4"));
        let (first, second) = tokio::join!(downloader.download(&schema), downloader.download(&schema));

        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first[0]).unwrap(), vec![7u8; MEDIA_LEN]);
    }

    #[tokio::test]
    async fn test_download_http_error_fails() {
        let addr = spawn_media_server().await;
        let config = temp_config();
        let downloader = MediaDownloader::new(reqwest::Client::new(), &config);

        let schema = media_schema(format!("http://{addr}/missing.mp4"));
        let result = downloader.download(&schema).await;

        assert!(matches!(result, Err(ServiceError::Http(_))));
        let dest = config
            .download_path
            .join(format!("{}.mp4", MediaDownloader::file_stem(&schema)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_move_file() {
        let config = temp_config();
        std::fs::create_dir_all(&config.temp_path).unwrap();
        std::fs::create_dir_all(&config.download_path).unwrap();

        let from = config.temp_path.join("a.part");
        let to = config.download_path.join("a.mp4");
        std::fs::write(&from, b"abc").unwrap();

        move_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"abc");
    }
}
