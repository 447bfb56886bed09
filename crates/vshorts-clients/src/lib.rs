//! Clients for the external services the pipeline depends on.
//!
//! This crate provides:
//! - Collaborator traits (catalog, analysis, render, publishing, downloads)
//! - YouTube Data API catalog client
//! - Gemini client with file store
//! - Creatomate render client
//! - YouTube resumable upload client with OAuth refresh
//! - yt-dlp audio fetcher and HTTP artifact fetcher
//! - Installed-app OAuth consent producing the publishing token

pub mod creatomate;
pub mod download;
pub mod error;
pub mod gemini;
pub mod oauth;
pub mod traits;
pub mod youtube;
pub mod youtube_upload;

pub use creatomate::{CreatomateClient, CreatomateConfig};
pub use download::{HttpArtifactFetcher, YtDlpAudioFetcher};
pub use error::{ClientError, ClientResult};
pub use gemini::{GeminiClient, GeminiConfig};
pub use oauth::{AuthorizedUser, ClientSecret, InstalledAppFlow};
pub use traits::{
    AnalysisService, ArtifactFetcher, AudioFetcher, CaptionTrack, CatalogService, FileRef,
    FileState, PrivacyStatus, PublishingService, RenderService, SearchHit, SearchOrder,
    SearchRequest, UploadMetadata, VideoDetails,
};
pub use youtube::{YouTubeCatalogClient, YouTubeConfig};
pub use youtube_upload::{YouTubeUploadClient, YouTubeUploadConfig};
