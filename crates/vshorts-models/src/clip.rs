//! Clip recommendation models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest clip the short-form platform accepts without rejecting it as a regular video.
pub const PLATFORM_MAX_CLIP_SECS: f64 = 58.0;

/// Segment proposed by the analysis backend for the short-form cut.
///
/// The recommendation may exceed the platform limit; use
/// [`ClipRecommendation::render_window`] to obtain the corrected window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRecommendation {
    /// Start offset in seconds
    pub start_time: f64,

    /// End offset in seconds
    pub end_time: f64,

    /// Short, catchy title for the clip
    pub viral_title: String,

    /// Why this segment should perform well
    #[serde(alias = "summary", alias = "reason")]
    pub rationale: String,
}

/// Errors produced while turning backend text into a recommendation.
#[derive(Debug, Error)]
pub enum ClipParseError {
    #[error("Response is not a valid clip JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid clip boundaries: start={start}, end={end}")]
    InvalidBoundaries { start: f64, end: f64 },

    #[error("Clip title is empty")]
    EmptyTitle,
}

/// Errors produced while deriving the render window.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClipWindowError {
    #[error("Clip duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("Maximum clip duration must be positive, got {0}")]
    InvalidMaximum(f64),
}

/// Trim window handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipWindow {
    /// Trim start in seconds (never negative)
    pub start: f64,

    /// Trim duration in seconds, `0 < duration <= max`
    pub duration: f64,
}

impl ClipRecommendation {
    /// Parse a backend response into a recommendation.
    ///
    /// Accepts an optional markdown code fence around the JSON object.
    pub fn from_model_text(text: &str) -> Result<Self, ClipParseError> {
        let text = strip_code_fence(text);
        let clip: ClipRecommendation = serde_json::from_str(text)?;

        if !clip.start_time.is_finite()
            || !clip.end_time.is_finite()
            || clip.start_time < 0.0
            || clip.end_time <= clip.start_time
        {
            return Err(ClipParseError::InvalidBoundaries {
                start: clip.start_time,
                end: clip.end_time,
            });
        }

        if clip.viral_title.trim().is_empty() {
            return Err(ClipParseError::EmptyTitle);
        }

        Ok(clip)
    }

    /// Raw duration as recommended, which may be non-positive or over-long.
    pub fn raw_duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Window passed to the renderer: duration is `min(end - start, max_secs)`.
    ///
    /// A non-positive or non-finite duration is rejected instead of passed through.
    pub fn render_window(&self, max_secs: f64) -> Result<ClipWindow, ClipWindowError> {
        if !max_secs.is_finite() || max_secs <= 0.0 {
            return Err(ClipWindowError::InvalidMaximum(max_secs));
        }

        let duration = self.raw_duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ClipWindowError::NonPositiveDuration(duration));
        }

        Ok(ClipWindow {
            start: self.start_time.max(0.0),
            duration: duration.min(max_secs),
        })
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(start: f64, end: f64) -> ClipRecommendation {
        ClipRecommendation {
            start_time: start,
            end_time: end,
            viral_title: "Title".to_string(),
            rationale: "Because".to_string(),
        }
    }

    #[test]
    fn test_render_window_clamps_long_clip() {
        let window = clip(100.0, 400.0).render_window(PLATFORM_MAX_CLIP_SECS).unwrap();
        assert_eq!(window.start, 100.0);
        assert_eq!(window.duration, PLATFORM_MAX_CLIP_SECS);
    }

    #[test]
    fn test_render_window_keeps_short_clip() {
        let window = clip(10.0, 40.5).render_window(PLATFORM_MAX_CLIP_SECS).unwrap();
        assert_eq!(window.duration, 30.5);
    }

    #[test]
    fn test_render_window_rejects_non_positive() {
        assert_eq!(
            clip(50.0, 50.0).render_window(58.0),
            Err(ClipWindowError::NonPositiveDuration(0.0))
        );
        assert!(clip(50.0, 20.0).render_window(58.0).is_err());
        assert!(clip(0.0, f64::NAN).render_window(58.0).is_err());
    }

    #[test]
    fn test_render_window_duration_always_in_bounds() {
        for (start, end) in [(0.0, 0.1), (3.0, 61.0), (1000.0, 1058.0), (5.0, 1e9)] {
            let window = clip(start, end).render_window(58.0).unwrap();
            assert!(window.duration > 0.0 && window.duration <= 58.0);
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let parsed = ClipRecommendation::from_model_text(
            r#"{"start_time": 120.5, "end_time": 165.2, "viral_title": "Wow", "summary": "Funny"}"#,
        )
        .unwrap();
        assert_eq!(parsed.start_time, 120.5);
        assert_eq!(parsed.rationale, "Funny");
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"start_time\": 1, \"end_time\": 20, \"viral_title\": \"T\", \"rationale\": \"R\"}\n```";
        let parsed = ClipRecommendation::from_model_text(text).unwrap();
        assert_eq!(parsed.end_time, 20.0);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = ClipRecommendation::from_model_text(r#"{"start_time": 1, "end_time": 20}"#);
        assert!(matches!(err, Err(ClipParseError::Json(_))));
    }

    #[test]
    fn test_parse_rejects_inverted_boundaries() {
        let err = ClipRecommendation::from_model_text(
            r#"{"start_time": 30, "end_time": 20, "viral_title": "T", "rationale": "R"}"#,
        );
        assert!(matches!(err, Err(ClipParseError::InvalidBoundaries { .. })));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(ClipRecommendation::from_model_text("I think 1:20 to 2:00 is best").is_err());
    }
}
