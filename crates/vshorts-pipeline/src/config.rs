//! Pipeline configuration.
//!
//! One explicit configuration object is built at run start and handed to
//! each component; nothing reads process state after that.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vshorts_clients::{PrivacyStatus, SearchOrder};
use vshorts_models::PLATFORM_MAX_CLIP_SECS;

use crate::error::{PipelineError, PipelineResult};

/// Channels watched when `VSHORTS_CHANNELS` is not set.
pub const DEFAULT_CHANNELS: &[&str] = &["Ibai Llanos", "TheGrefg", "ElRubius", "AuronPlay", "IlloJuan"];

/// Shortest pause between two status checks of a remote job.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable holding the full credential JSON blob.
pub const TOKEN_ENV_VAR: &str = "YOUTUBE_TOKEN_JSON";

/// How one video is picked from the result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// Always the first result
    First,
    /// Uniformly random among the page, to avoid repeating the same pick
    #[default]
    Random,
}

impl FromStr for SelectionStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "random" => Ok(Self::Random),
            other => Err(PipelineError::config_error(format!(
                "unknown selection strategy '{}'",
                other
            ))),
        }
    }
}

/// Evidence fed to the analysis backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisStrategy {
    /// Title, description and statistics only
    #[default]
    MetadataOnly,
    /// Uploaded audio track
    AudioGrounded,
}

impl FromStr for AnalysisStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metadata" | "metadata_only" => Ok(Self::MetadataOnly),
            "audio" | "audio_grounded" => Ok(Self::AudioGrounded),
            other => Err(PipelineError::config_error(format!(
                "unknown analysis strategy '{}'",
                other
            ))),
        }
    }
}

/// Candidate search and selection settings.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub channels: Vec<String>,
    pub order: SearchOrder,
    pub strategy: SelectionStrategy,
    /// Only videos published within this window are considered
    pub recency_window: chrono::Duration,
    pub page_size: u32,
    pub language: Option<String>,
    pub long_form_only: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            order: SearchOrder::Date,
            strategy: SelectionStrategy::Random,
            recency_window: chrono::Duration::days(7),
            page_size: 5,
            language: Some("es".to_string()),
            long_form_only: true,
        }
    }
}

/// Clip analysis settings.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub strategy: AnalysisStrategy,
    /// Seconds at the start of the video to stay clear of (intros, music)
    pub intro_skip_secs: u32,
    pub min_clip_secs: u32,
    pub max_clip_secs: u32,
    /// Upper bound on model candidates tried per run
    pub max_model_candidates: usize,
    pub upload_poll_interval: Duration,
    pub upload_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strategy: AnalysisStrategy::MetadataOnly,
            intro_skip_secs: 60,
            min_clip_secs: 15,
            max_clip_secs: 58,
            max_model_candidates: 8,
            upload_poll_interval: Duration::from_secs(2),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

/// Render settings.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Platform-safe maximum clip duration in seconds
    pub max_clip_secs: f64,
    pub poll_interval: Duration,
    /// Wall-clock budget for one tier (submit + polling)
    pub tier_timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            max_clip_secs: PLATFORM_MAX_CLIP_SECS,
            poll_interval: Duration::from_secs(5),
            tier_timeout: Duration::from_secs(300),
        }
    }
}

/// Publishing settings.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub category_id: String,
    pub tags: Vec<String>,
    pub privacy: PrivacyStatus,
    pub made_for_kids: bool,
    /// Stop after rendering
    pub dry_run: bool,
    pub token_env_var: String,
    pub token_file: PathBuf,
    pub download_timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            category_id: "24".to_string(),
            tags: ["shorts", "viral", "clip", "español"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            privacy: PrivacyStatus::Public,
            made_for_kids: false,
            dry_run: false,
            token_env_var: TOKEN_ENV_VAR.to_string(),
            token_file: default_token_file(),
            download_timeout: Duration::from_secs(300),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub youtube_api_key: String,
    pub gemini_api_key: String,
    pub creatomate_api_key: String,
    pub work_dir: PathBuf,
    pub selection: SelectionConfig,
    pub analysis: AnalysisConfig,
    pub render: RenderConfig,
    pub publish: PublishConfig,
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Missing service keys are definitive configuration errors.
    pub fn from_env() -> PipelineResult<Self> {
        let selection_defaults = SelectionConfig::default();
        let analysis_defaults = AnalysisConfig::default();
        let render_defaults = RenderConfig::default();
        let publish_defaults = PublishConfig::default();

        let channels = std::env::var("VSHORTS_CHANNELS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|c| !c.is_empty())
            .unwrap_or(selection_defaults.channels);

        let order = match std::env::var("VSHORTS_SEARCH_ORDER").ok().as_deref() {
            None | Some("date") => SearchOrder::Date,
            Some("viewCount") | Some("view_count") => SearchOrder::ViewCount,
            Some(other) => {
                return Err(PipelineError::config_error(format!(
                    "VSHORTS_SEARCH_ORDER must be 'date' or 'viewCount', got '{}'",
                    other
                )))
            }
        };

        let strategy = match std::env::var("VSHORTS_SELECTION") {
            Ok(v) => v.parse()?,
            Err(_) => selection_defaults.strategy,
        };

        let analysis_strategy = match std::env::var("VSHORTS_ANALYSIS_STRATEGY") {
            Ok(v) => v.parse()?,
            Err(_) => analysis_defaults.strategy,
        };

        let max_clip_secs: u32 = env_or("VSHORTS_MAX_CLIP_SECS", analysis_defaults.max_clip_secs);

        let config = Self {
            youtube_api_key: required_env("YOUTUBE_API_KEY")?,
            gemini_api_key: required_env("GEMINI_API_KEY")?,
            creatomate_api_key: required_env("CREATOMATE_API_KEY")?,
            work_dir: std::env::var("VSHORTS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/vshorts")),
            selection: SelectionConfig {
                channels,
                order,
                strategy,
                recency_window: chrono::Duration::days(env_or("VSHORTS_RECENCY_DAYS", 7)),
                page_size: env_or("VSHORTS_PAGE_SIZE", selection_defaults.page_size),
                language: std::env::var("VSHORTS_LANGUAGE")
                    .ok()
                    .or(selection_defaults.language)
                    .filter(|l| !l.is_empty()),
                long_form_only: env_or("VSHORTS_LONG_FORM_ONLY", selection_defaults.long_form_only),
            },
            analysis: AnalysisConfig {
                strategy: analysis_strategy,
                intro_skip_secs: env_or("VSHORTS_INTRO_SKIP_SECS", analysis_defaults.intro_skip_secs),
                min_clip_secs: env_or("VSHORTS_MIN_CLIP_SECS", analysis_defaults.min_clip_secs),
                max_clip_secs,
                max_model_candidates: env_or(
                    "VSHORTS_MAX_MODEL_CANDIDATES",
                    analysis_defaults.max_model_candidates,
                ),
                upload_poll_interval: Duration::from_secs(env_or("VSHORTS_UPLOAD_POLL_SECS", 2)),
                upload_timeout: Duration::from_secs(env_or("VSHORTS_UPLOAD_TIMEOUT_SECS", 300)),
            },
            render: RenderConfig {
                max_clip_secs: f64::from(max_clip_secs).min(render_defaults.max_clip_secs),
                poll_interval: Duration::from_secs(env_or("VSHORTS_RENDER_POLL_SECS", 5)),
                tier_timeout: Duration::from_secs(env_or("VSHORTS_RENDER_TIMEOUT_SECS", 300)),
                ..render_defaults
            },
            publish: PublishConfig {
                dry_run: env_or("VSHORTS_DRY_RUN", false),
                token_file: std::env::var("VSHORTS_TOKEN_FILE")
                    .map(PathBuf::from)
                    .unwrap_or(publish_defaults.token_file.clone()),
                ..publish_defaults
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject timing values that would stall or spin the polling stages.
    pub fn validate(&self) -> PipelineResult<()> {
        let analysis = &self.analysis;
        check_poll_interval("VSHORTS_UPLOAD_POLL_SECS", analysis.upload_poll_interval)?;
        check_nonzero("VSHORTS_UPLOAD_TIMEOUT_SECS", analysis.upload_timeout)?;
        if analysis.max_clip_secs == 0 || analysis.min_clip_secs > analysis.max_clip_secs {
            return Err(PipelineError::config_error(format!(
                "VSHORTS_MAX_CLIP_SECS must be at least 1 and not below VSHORTS_MIN_CLIP_SECS ({}), got {}",
                analysis.min_clip_secs, analysis.max_clip_secs
            )));
        }

        let render = &self.render;
        check_poll_interval("VSHORTS_RENDER_POLL_SECS", render.poll_interval)?;
        check_nonzero("VSHORTS_RENDER_TIMEOUT_SECS", render.tier_timeout)?;
        if render.max_clip_secs < 1.0 {
            return Err(PipelineError::config_error(format!(
                "render clip maximum must be at least 1s, got {}",
                render.max_clip_secs
            )));
        }

        if self.selection.page_size == 0 {
            return Err(PipelineError::config_error("VSHORTS_PAGE_SIZE must be at least 1"));
        }
        Ok(())
    }
}

fn check_poll_interval(key: &str, interval: Duration) -> PipelineResult<()> {
    if interval < MIN_POLL_INTERVAL {
        return Err(PipelineError::config_error(format!(
            "{} must be at least {}s, got {:?}",
            key,
            MIN_POLL_INTERVAL.as_secs(),
            interval
        )));
    }
    Ok(())
}

fn check_nonzero(key: &str, timeout: Duration) -> PipelineResult<()> {
    if timeout.is_zero() {
        return Err(PipelineError::config_error(format!("{} must be greater than 0", key)));
    }
    Ok(())
}

/// `token.json` next to the running executable, or in the working directory
/// when the executable path is unknown.
pub fn default_token_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("token.json")))
        .unwrap_or_else(|| PathBuf::from("token.json"))
}

fn required_env(key: &str) -> PipelineResult<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PipelineError::config_error(format!("{} not set", key))),
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let render = RenderConfig::default();
        assert_eq!(render.max_clip_secs, 58.0);
        assert_eq!(render.poll_interval, Duration::from_secs(5));
        assert_eq!(render.tier_timeout, Duration::from_secs(300));

        let selection = SelectionConfig::default();
        assert_eq!(selection.page_size, 5);
        assert_eq!(selection.channels.len(), DEFAULT_CHANNELS.len());
        assert_eq!(selection.strategy, SelectionStrategy::Random);

        let publish = PublishConfig::default();
        assert_eq!(publish.category_id, "24");
        assert!(!publish.made_for_kids);
        assert!(publish.token_file.ends_with("token.json"));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("first".parse::<SelectionStrategy>().unwrap(), SelectionStrategy::First);
        assert_eq!("RANDOM".parse::<SelectionStrategy>().unwrap(), SelectionStrategy::Random);
        assert!("sometimes".parse::<SelectionStrategy>().is_err());

        assert_eq!("audio".parse::<AnalysisStrategy>().unwrap(), AnalysisStrategy::AudioGrounded);
        assert_eq!(
            "metadata".parse::<AnalysisStrategy>().unwrap(),
            AnalysisStrategy::MetadataOnly
        );
    }

    fn valid_config() -> PipelineConfig {
        PipelineConfig {
            youtube_api_key: "yt".to_string(),
            gemini_api_key: "gm".to_string(),
            creatomate_api_key: "cm".to_string(),
            work_dir: PathBuf::from("/tmp/vshorts-test"),
            selection: SelectionConfig::default(),
            analysis: AnalysisConfig::default(),
            render: RenderConfig::default(),
            publish: PublishConfig::default(),
        }
    }

    fn assert_rejected(config: PipelineConfig, key: &str) {
        let err = config.validate().unwrap_err();
        assert!(err.is_definitive());
        assert!(err.to_string().contains(key), "{} not named in '{}'", key, err);
    }

    #[test]
    fn test_default_timings_are_valid() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_zero_render_poll_rejected() {
        let mut config = valid_config();
        config.render.poll_interval = Duration::ZERO;
        assert_rejected(config, "VSHORTS_RENDER_POLL_SECS");
    }

    #[test]
    fn test_zero_upload_poll_rejected() {
        let mut config = valid_config();
        config.analysis.upload_poll_interval = Duration::ZERO;
        assert_rejected(config, "VSHORTS_UPLOAD_POLL_SECS");
    }

    #[test]
    fn test_zero_render_timeout_rejected() {
        let mut config = valid_config();
        config.render.tier_timeout = Duration::ZERO;
        assert_rejected(config, "VSHORTS_RENDER_TIMEOUT_SECS");
    }

    #[test]
    fn test_zero_upload_timeout_rejected() {
        let mut config = valid_config();
        config.analysis.upload_timeout = Duration::ZERO;
        assert_rejected(config, "VSHORTS_UPLOAD_TIMEOUT_SECS");
    }

    #[test]
    fn test_zero_max_clip_rejected() {
        let mut config = valid_config();
        config.analysis.max_clip_secs = 0;
        config.render.max_clip_secs = 0.0;
        assert_rejected(config, "VSHORTS_MAX_CLIP_SECS");

        let mut config = valid_config();
        config.render.max_clip_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = valid_config();
        config.selection.page_size = 0;
        assert_rejected(config, "VSHORTS_PAGE_SIZE");
    }

    #[test]
    fn test_required_env_rejects_missing() {
        let err = required_env("VSHORTS_TEST_DEFINITELY_UNSET_KEY").unwrap_err();
        assert!(err.is_definitive());
        assert!(err.to_string().contains("VSHORTS_TEST_DEFINITELY_UNSET_KEY"));
    }
}
