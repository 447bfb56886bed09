//! Shared data models for the ViralShorts pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source videos and their optional statistics
//! - Clip recommendations and the platform-safe render window
//! - Analysis model candidates and their preference tiers
//! - Render job specifications and render outcomes
//! - Publishing credentials

pub mod clip;
pub mod credentials;
pub mod model;
pub mod render;
pub mod run;
pub mod video;

// Re-export common types
pub use clip::{ClipParseError, ClipRecommendation, ClipWindow, ClipWindowError, PLATFORM_MAX_CLIP_SECS};
pub use credentials::{AccessToken, Credentials, DEFAULT_TOKEN_URI, YOUTUBE_UPLOAD_SCOPE};
pub use model::{ModelCandidate, ModelTier, FALLBACK_MODELS};
pub use render::{
    CaptionLayer, RenderJobSpec, RenderResult, RenderState, RenderStatus, RenderTier, VideoLayer,
    VIDEO_LAYER_ID,
};
pub use run::RunId;
pub use video::{SourceVideo, VideoId, VideoMetrics};
