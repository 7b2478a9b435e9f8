//! Kuaishou service.
//!
//! Ties link examination, page fetching, extraction and mapping together for
//! `/info`, and drives background downloads for `/download`.

use deadpool_redis::Pool;

use crate::config::AppConfig;
use crate::models::{TaskRegistry, VideoSchema};
use crate::services::examiner::extract_params;
use crate::services::{
    map_detail, DetailPage, Examiner, HtmlExtractor, InfoCache, MediaDownloader, ServiceError,
};

/// Shared service handle. Cheap to clone.
#[derive(Clone)]
pub struct KuaishouService {
    examiner: Examiner,
    page: DetailPage,
    downloader: MediaDownloader,
    cache: Option<InfoCache>,
}

impl KuaishouService {
    pub fn new(client: reqwest::Client, config: &AppConfig, cache_pool: Option<Pool>) -> Self {
        let cookie = config.kuaishou_cookie.clone();
        Self {
            examiner: Examiner::new(client.clone(), cookie.clone(), config.ks_max_retry),
            page: DetailPage::new(client.clone(), cookie, config.ks_max_retry),
            downloader: MediaDownloader::new(client, config),
            cache: cache_pool.map(|pool| InfoCache::new(pool, config.cache_ttl_secs)),
        }
    }

    /// Extracts normalized metadata for the first Kuaishou link in `url`.
    pub async fn video_metadata(&self, url: &str) -> Result<VideoSchema, ServiceError> {
        if let Some(cache) = &self.cache {
            match cache.get(url).await {
                Ok(Some(schema)) => {
                    tracing::debug!(video_id = %schema.video_id, "Info cache hit");
                    return Ok(with_original_url(schema, url));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Info cache read failed"),
            }
        }

        let links = self.examiner.resolve(url).await;
        let Some(link) = links.first() else {
            return Err(ServiceError::NoLink);
        };

        let params = extract_params(link)?;
        tracing::info!(
            link = %link,
            detail_id = %params.detail_id,
            web = params.web,
            "Extracting work metadata"
        );

        let html = self
            .page
            .fetch(link, params.web)
            .await?
            .ok_or(ServiceError::PageUnavailable)?;

        let detail = HtmlExtractor::run(&html, &params.detail_id, params.web)?;
        let schema = map_detail(&detail, url);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(url, &schema).await {
                tracing::warn!(error = %e, "Info cache write failed");
            }
        }

        Ok(schema)
    }

    /// Runs a queued download, recording progress in `tasks`.
    pub async fn perform_download(&self, url: &str, task_id: &str, tasks: &TaskRegistry) {
        tasks.set_processing(task_id, "初始化下载...").await;

        let schema = match self.video_metadata(url).await {
            Ok(schema) => schema,
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Download metadata extraction failed");
                tasks.fail(task_id, failure_message(&e)).await;
                return;
            }
        };

        tasks.set_processing(task_id, "开始下载文件...").await;

        match self.downloader.download(&schema).await {
            Ok(paths) => {
                let result_path = paths
                    .first()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                tracing::info!(task_id = %task_id, files = paths.len(), "Download task completed");
                tasks.complete(task_id, "下载成功", result_path).await;
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Download task failed");
                tasks.fail(task_id, failure_message(&e)).await;
            }
        }
    }

    /// `true` when no cache is configured or the cache is reachable.
    pub async fn cache_ok(&self) -> bool {
        match &self.cache {
            Some(cache) => cache.is_reachable().await,
            None => true,
        }
    }
}

/// Cached entries are shared by inputs that trim to the same text; report
/// the caller's own input.
fn with_original_url(mut schema: VideoSchema, url: &str) -> VideoSchema {
    url.clone_into(&mut schema.original_url);
    schema
}

fn failure_message(err: &ServiceError) -> String {
    match err {
        ServiceError::LoginRequired => format!("下载失败，可能需要有效 Cookie: {err}"),
        other => format!("下载失败: {other}"),
    }
}
