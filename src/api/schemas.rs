//! 요청/응답 스키마 모듈.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{TaskRecord, TaskStatus, VideoSchema};

/// Body of `POST /info` and `POST /download`.
///
/// `url` may be a share link, a detail link or share text containing one.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InfoRequest {
    #[validate(length(min = 1, max = 2048, message = "url must be 1 to 2048 characters"))]
    pub url: String,
}

/// Successful `/info` response.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: VideoSchema,
}

impl InfoResponse {
    pub const fn success(data: VideoSchema) -> Self {
        Self {
            status: "success",
            message: "信息提取成功",
            data,
        }
    }
}

/// Response for an accepted download.
#[derive(Debug, Serialize)]
pub struct DownloadQueuedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub task_id: String,
}

impl DownloadQueuedResponse {
    pub const fn queued(task_id: String) -> Self {
        Self {
            status: "queued",
            message: "下载任务已加入后台队列",
            task_id,
        }
    }
}

/// Background task status.
#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
}

impl TaskStatusResponse {
    pub fn from_record(task_id: String, record: TaskRecord) -> Self {
        Self {
            task_id,
            status: record.status,
            message: record.message,
            result_path: record.result_path,
        }
    }
}

/// `GET /` response.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}
