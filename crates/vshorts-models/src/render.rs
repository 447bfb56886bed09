//! Render job models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clip::ClipWindow;

/// Element ID of the trimmed source layer; the caption layer binds to it.
pub const VIDEO_LAYER_ID: &str = "source-video";

/// Fallback tier of a render job, attempted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderTier {
    /// Trimmed video plus auto-generated captions
    Rich,
    /// Trimmed video only
    Degraded,
}

impl RenderTier {
    /// All tiers in the order they are attempted.
    pub const ALL: [RenderTier; 2] = [RenderTier::Rich, RenderTier::Degraded];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderTier::Rich => "rich",
            RenderTier::Degraded => "degraded",
        }
    }
}

impl fmt::Display for RenderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trimmed source video layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoLayer {
    /// Layer identifier other layers can reference
    pub id: String,
    /// Source video URL
    pub source_url: String,
    /// Trim start in seconds
    pub trim_start: f64,
    /// Trim duration in seconds
    pub trim_duration: f64,
}

/// Auto-generated caption layer bound to a video layer's audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionLayer {
    /// ID of the video layer whose audio is transcribed
    pub transcript_source: String,
    /// Caption animation effect
    pub effect: String,
}

/// Declarative description of the output composition.
///
/// Built fresh for every attempt and never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJobSpec {
    pub tier: RenderTier,
    pub width: u32,
    pub height: u32,
    pub output_format: String,
    pub video: VideoLayer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<CaptionLayer>,
}

impl RenderJobSpec {
    /// Video layer plus a caption layer bound to its audio.
    pub fn rich(source_url: &str, window: ClipWindow, width: u32, height: u32) -> Self {
        Self {
            captions: Some(CaptionLayer {
                transcript_source: VIDEO_LAYER_ID.to_string(),
                effect: "highlight".to_string(),
            }),
            ..Self::video_only(RenderTier::Rich, source_url, window, width, height)
        }
    }

    /// Identical video layer with captions omitted.
    pub fn degraded(source_url: &str, window: ClipWindow, width: u32, height: u32) -> Self {
        Self::video_only(RenderTier::Degraded, source_url, window, width, height)
    }

    /// Build the spec for a given tier.
    pub fn for_tier(tier: RenderTier, source_url: &str, window: ClipWindow, width: u32, height: u32) -> Self {
        match tier {
            RenderTier::Rich => Self::rich(source_url, window, width, height),
            RenderTier::Degraded => Self::degraded(source_url, window, width, height),
        }
    }

    fn video_only(tier: RenderTier, source_url: &str, window: ClipWindow, width: u32, height: u32) -> Self {
        Self {
            tier,
            width,
            height,
            output_format: "mp4".to_string(),
            video: VideoLayer {
                id: VIDEO_LAYER_ID.to_string(),
                source_url: source_url.to_string(),
                trim_start: window.start,
                trim_duration: window.duration,
            },
            captions: None,
        }
    }

    pub fn has_captions(&self) -> bool {
        self.captions.is_some()
    }
}

/// Render job state as reported by the rendering service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    Succeeded,
    Failed,
    /// Any non-terminal state (planned, waiting, transcribing, rendering, ...)
    #[serde(other)]
    InProgress,
}

/// Status report for a submitted render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderStatus {
    pub state: RenderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RenderStatus {
    pub fn in_progress() -> Self {
        Self {
            state: RenderState::InProgress,
            url: None,
            error_message: None,
        }
    }

    pub fn succeeded(url: impl Into<String>) -> Self {
        Self {
            state: RenderState::Succeeded,
            url: Some(url.into()),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: RenderState::Failed,
            url: None,
            error_message: Some(message.into()),
        }
    }
}

/// Terminal outcome of a render attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RenderResult {
    Succeeded { artifact_url: String },
    Failed { reason: String },
}
