//! Source video models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a source video (YouTube video ID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A candidate video returned by the catalog search.
///
/// Immutable once fetched: produced by candidate selection, consumed by
/// analysis and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceVideo {
    /// Catalog identifier
    pub id: VideoId,

    /// Video title
    pub title: String,

    /// Name of the channel that published the video
    pub channel: String,

    /// Canonical watch URL
    pub url: String,
}

impl SourceVideo {
    /// Create a source video, deriving the canonical watch URL from the ID.
    pub fn new(id: impl Into<VideoId>, title: impl Into<String>, channel: impl Into<String>) -> Self {
        let id = id.into();
        let url = id.watch_url();
        Self {
            id,
            title: title.into(),
            channel: channel.into(),
            url,
        }
    }
}

/// Optional statistics enrichment for a [`SourceVideo`].
///
/// Fetched on demand during analysis; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetrics {
    #[serde(default)]
    pub view_count: u64,

    #[serde(default)]
    pub like_count: u64,

    /// ISO-8601 duration string (e.g. `PT1H2M3S`)
    #[serde(default)]
    pub duration: String,

    /// Leading excerpt of the video description
    #[serde(default)]
    pub description_excerpt: String,
}

impl VideoMetrics {
    /// Maximum number of description characters kept in the excerpt.
    pub const EXCERPT_CHARS: usize = 1500;

    /// Build metrics from raw catalog details, truncating the description.
    pub fn new(view_count: u64, like_count: u64, duration: impl Into<String>, description: &str) -> Self {
        Self {
            view_count,
            like_count,
            duration: duration.into(),
            description_excerpt: description.chars().take(Self::EXCERPT_CHARS).collect(),
        }
    }

    /// Parse the ISO-8601 duration into seconds.
    ///
    /// Only the `PnDTnHnMnS` subset used by the catalog is understood.
    pub fn duration_secs(&self) -> Option<f64> {
        parse_iso8601_duration(&self.duration)
    }
}

fn parse_iso8601_duration(value: &str) -> Option<f64> {
    let rest = value.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut total = 0.0;
    let mut number = String::new();

    for c in date_part.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'D' => {
                total += number.parse::<f64>().ok()? * 86_400.0;
                number.clear();
            }
            'W' => {
                total += number.parse::<f64>().ok()? * 604_800.0;
                number.clear();
            }
            _ => return None,
        }
    }

    for c in time_part.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'H' => {
                total += number.parse::<f64>().ok()? * 3600.0;
                number.clear();
            }
            'M' => {
                total += number.parse::<f64>().ok()? * 60.0;
                number.clear();
            }
            'S' => {
                total += number.parse::<f64>().ok()?;
                number.clear();
            }
            _ => return None,
        }
    }

    if !number.is_empty() {
        return None;
    }

    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_video_watch_url() {
        let video = SourceVideo::new("abc123def45", "Title", "Channel");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=abc123def45");
        assert_eq!(video.id.as_str(), "abc123def45");
    }

    #[test]
    fn test_duration_parsing() {
        let metrics = VideoMetrics::new(1, 1, "PT1H2M3S", "");
        assert_eq!(metrics.duration_secs(), Some(3723.0));

        let metrics = VideoMetrics::new(1, 1, "P1DT5S", "");
        assert_eq!(metrics.duration_secs(), Some(86_405.0));

        let metrics = VideoMetrics::new(1, 1, "garbage", "");
        assert_eq!(metrics.duration_secs(), None);
    }

    #[test]
    fn test_description_excerpt_truncated() {
        let long = "a".repeat(5000);
        let metrics = VideoMetrics::new(0, 0, "PT10M", &long);
        assert_eq!(metrics.description_excerpt.len(), VideoMetrics::EXCERPT_CHARS);
    }
}
