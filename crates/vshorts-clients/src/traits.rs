//! Collaborator interfaces consumed by the pipeline.
//!
//! Every external dependency sits behind one of these traits so pipeline
//! stages can be exercised against in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vshorts_models::{Credentials, RenderJobSpec, RenderStatus};

use crate::error::ClientResult;

// =============================================================================
// Catalog
// =============================================================================

/// Result ordering requested from the catalog search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SearchOrder {
    /// Most recently published first
    #[default]
    Date,
    /// Most viewed first
    ViewCount,
}

impl SearchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Date => "date",
            SearchOrder::ViewCount => "viewCount",
        }
    }
}

/// Catalog search parameters.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub order: SearchOrder,
    pub published_after: DateTime<Utc>,
    pub page_size: u32,
    pub language: Option<String>,
    /// Restrict to long-form uploads (> 20 minutes)
    pub long_form_only: bool,
}

/// One entry of a search result page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub channel: String,
}

/// Detailed metadata for a single video.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoDetails {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub view_count: u64,
    pub like_count: u64,
}

/// A caption track available for a video.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language: String,
}

/// Video catalog/search service.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> ClientResult<Vec<SearchHit>>;

    async fn video_details(&self, video_id: &str) -> ClientResult<VideoDetails>;

    async fn caption_tracks(&self, video_id: &str) -> ClientResult<Vec<CaptionTrack>>;
}

// =============================================================================
// Generative analysis
// =============================================================================

/// Reference to a file held in the analysis backend's file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    /// URI passed to generation calls
    pub uri: String,
    pub mime_type: String,
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Active,
    Failed,
}

/// Generative-analysis service with its file store.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Identifiers of models that support content generation.
    async fn list_models(&self) -> ClientResult<Vec<String>>;

    /// Run one generation call, returning the raw response text.
    async fn generate(&self, model: &str, prompt: &str, media: Option<&FileRef>) -> ClientResult<String>;

    async fn upload_file(&self, path: &Path, mime_type: &str) -> ClientResult<FileRef>;

    async fn file_state(&self, file: &FileRef) -> ClientResult<FileState>;

    async fn delete_file(&self, file: &FileRef) -> ClientResult<()>;
}

// =============================================================================
// Rendering
// =============================================================================

/// Cloud rendering service.
#[async_trait]
pub trait RenderService: Send + Sync {
    /// Submit a job, returning its identifier.
    async fn submit(&self, spec: &RenderJobSpec) -> ClientResult<String>;

    async fn status(&self, job_id: &str) -> ClientResult<RenderStatus>;
}

// =============================================================================
// Publishing
// =============================================================================

/// Visibility of a published video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Unlisted,
    Private,
}

/// Metadata attached to an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub tags: Vec<String>,
    pub privacy: PrivacyStatus,
    pub made_for_kids: bool,
}

/// Publishing service accepting authenticated uploads.
#[async_trait]
pub trait PublishingService: Send + Sync {
    /// Upload a local file, returning the published identifier.
    async fn upload(
        &self,
        file: &Path,
        metadata: &UploadMetadata,
        credentials: &Credentials,
    ) -> ClientResult<String>;
}

// =============================================================================
// Out-of-band transfers
// =============================================================================

/// Downloads the audio track of a source video.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Write the audio into `dest_dir`, returning the produced file path.
    async fn fetch_audio(&self, video_url: &str, dest_dir: &Path) -> ClientResult<PathBuf>;
}

/// Downloads a rendered artifact.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Write the artifact at `url` to `dest`, returning the byte count.
    async fn fetch(&self, url: &str, dest: &Path) -> ClientResult<u64>;
}
