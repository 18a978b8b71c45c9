use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One stored image, derived entirely from its location on disk.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    #[serde(skip)]
    pub path: PathBuf,
    /// Opaque `section/date/filename` handle handed out to callers.
    pub handle: String,
    pub url: String,
    pub filename: String,
    pub section: String,
    pub date: String,
    /// Display time (`HH:MM:SS`).
    pub time: String,
    pub sort_key: String,
    pub timestamp: Option<NaiveDateTime>,
    pub size: u64,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub image_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeaturedImage {
    pub section: String,
    pub image: ImageRecord,
}

/// Outcome of a best-effort cascading section delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub files_removed: usize,
    pub files_failed: usize,
    pub dirs_removed: usize,
    pub dirs_failed: usize,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.files_failed == 0 && self.dirs_failed == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    pub stored: Option<ImageRecord>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub section: String,
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn new(section: &str) -> Self {
        Self {
            section: section.to_string(),
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, filename: String, image: ImageRecord) {
        self.succeeded += 1;
        self.files.push(UploadOutcome {
            filename,
            stored: Some(image),
            error: None,
        });
    }

    pub fn record_failure(&mut self, filename: String, error: String) {
        self.failed += 1;
        self.files.push(UploadOutcome {
            filename,
            stored: None,
            error: Some(error),
        });
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSectionRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionRequest {
    pub caption: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImageQuery {
    #[serde(default)]
    pub download: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeaturedQuery {
    pub limit: Option<usize>,
}
