//! Kuaishou service module.
//!
//! Link examination, detail page fetching, page state extraction,
//! normalization and media downloads.

pub mod cache;
pub mod downloader;
pub mod examiner;
pub mod extractor;
pub mod kuaishou;
pub mod mapper;
pub mod page;

use thiserror::Error;

pub use cache::InfoCache;
pub use downloader::MediaDownloader;
pub use examiner::{Examiner, LinkParams};
pub use extractor::{ExtractError, ExtractedDetail, HtmlExtractor, PhotoType};
pub use kuaishou::KuaishouService;
pub use mapper::map_detail;
pub use page::DetailPage;

/// Failures of the Kuaishou pipeline.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("no Kuaishou link found in input")]
    NoLink,

    #[error("could not determine the work id from the link")]
    NoDetailId,

    #[error("detail page could not be fetched")]
    PageUnavailable,

    #[error("Kuaishou requires login, cookie missing or expired")]
    LoginRequired,

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExtractError> for ServiceError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::LoginRequired => Self::LoginRequired,
            other => Self::ExtractionFailed(other.to_string()),
        }
    }
}
