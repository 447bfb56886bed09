//! Clip analysis with model fallback.
//!
//! The analyzer asks a generative backend for the most viral segment of a
//! source video. Evidence is either the video's metadata or its audio track
//! uploaded to the backend's file store. Generation runs over a ranked list
//! of model candidates; any failure advances to the next candidate and only
//! exhausting the list yields `None`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use vshorts_clients::{AnalysisService, AudioFetcher, CatalogService, FileRef, FileState};
use vshorts_models::{ClipRecommendation, ModelCandidate, SourceVideo, VideoMetrics};

use crate::config::{AnalysisConfig, AnalysisStrategy, MIN_POLL_INTERVAL};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics::record_model_attempt;

/// Mime type of the extracted audio track.
pub const AUDIO_MIME_TYPE: &str = "audio/mp3";

/// Why a single model attempt failed. Used for logging only; every kind
/// advances the loop the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    NotFound,
    InvalidOutput,
    Other,
}

impl FailureKind {
    pub fn of(error: &PipelineError) -> Self {
        match error {
            PipelineError::Client(e) if e.is_rate_limited() => FailureKind::RateLimited,
            PipelineError::Client(e) if e.is_not_found() => FailureKind::NotFound,
            PipelineError::ClipParse(_) => FailureKind::InvalidOutput,
            _ => FailureKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::NotFound => "not_found",
            FailureKind::InvalidOutput => "invalid_output",
            FailureKind::Other => "error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ClipAnalyzer {
    analysis: Arc<dyn AnalysisService>,
    catalog: Arc<dyn CatalogService>,
    audio: Option<Arc<dyn AudioFetcher>>,
    config: AnalysisConfig,
    work_dir: PathBuf,
}

impl ClipAnalyzer {
    pub fn new(
        analysis: Arc<dyn AnalysisService>,
        catalog: Arc<dyn CatalogService>,
        config: AnalysisConfig,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            analysis,
            catalog,
            audio: None,
            config,
            work_dir: work_dir.into(),
        }
    }

    /// Audio source used by the audio-grounded strategy.
    pub fn with_audio_fetcher(mut self, audio: Arc<dyn AudioFetcher>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub async fn analyze(&self, video: &SourceVideo) -> Option<ClipRecommendation> {
        info!(
            video_id = %video.id,
            strategy = ?self.config.strategy,
            "Analyzing video for a viral segment"
        );

        match self.config.strategy {
            AnalysisStrategy::MetadataOnly => {
                let prompt = self.metadata_prompt(video).await;
                self.run_models(&prompt, None).await
            }
            AnalysisStrategy::AudioGrounded => self.analyze_audio(video).await,
        }
    }

    /// Ranked model candidates: live catalog when reachable, static list otherwise.
    pub async fn model_candidates(&self) -> Vec<ModelCandidate> {
        let ranked = match self.analysis.list_models().await {
            Ok(ids) => {
                let ranked = ModelCandidate::rank_catalog(ids);
                if ranked.is_empty() {
                    warn!("Model catalog returned no generation models, using fallback list");
                    ModelCandidate::fallback()
                } else {
                    ranked
                }
            }
            Err(e) => {
                warn!(error = %e, "Model catalog unavailable, using fallback list");
                ModelCandidate::fallback()
            }
        };

        ranked
            .into_iter()
            .take(self.config.max_model_candidates.max(1))
            .collect()
    }

    async fn run_models(&self, prompt: &str, media: Option<&FileRef>) -> Option<ClipRecommendation> {
        let candidates = self.model_candidates().await;
        let mut last_error: Option<PipelineError> = None;

        for candidate in &candidates {
            debug!(model = %candidate.id, tier = %candidate.tier, "Attempting generation");

            match self.attempt(&candidate.id, prompt, media).await {
                Ok(clip) => {
                    record_model_attempt(&candidate.id, "success");
                    info!(
                        model = %candidate.id,
                        start = clip.start_time,
                        end = clip.end_time,
                        title = %clip.viral_title,
                        "Clip recommendation received"
                    );
                    return Some(clip);
                }
                Err(e) => {
                    let kind = FailureKind::of(&e);
                    record_model_attempt(&candidate.id, kind.as_str());
                    match kind {
                        FailureKind::RateLimited => {
                            warn!(model = %candidate.id, error = %e, "Model rate limited, trying next candidate")
                        }
                        FailureKind::NotFound => {
                            warn!(model = %candidate.id, error = %e, "Model not available, trying next candidate")
                        }
                        _ => {
                            warn!(model = %candidate.id, kind = %kind, error = %e, "Model attempt failed, trying next candidate")
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        error!(
            attempted = candidates.len(),
            last_error = %last_error.map(|e| e.to_string()).unwrap_or_else(|| "no candidates".to_string()),
            "All model candidates failed"
        );
        None
    }

    async fn attempt(
        &self,
        model: &str,
        prompt: &str,
        media: Option<&FileRef>,
    ) -> PipelineResult<ClipRecommendation> {
        let text = self.analysis.generate(model, prompt, media).await?;
        Ok(ClipRecommendation::from_model_text(&text)?)
    }

    async fn metadata_prompt(&self, video: &SourceVideo) -> String {
        let metrics = match self.catalog.video_details(video.id.as_str()).await {
            Ok(details) => Some(VideoMetrics::new(
                details.view_count,
                details.like_count,
                details.duration,
                &details.description,
            )),
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Video details unavailable, using title only");
                None
            }
        };

        let caption_languages = match self.catalog.caption_tracks(video.id.as_str()).await {
            Ok(tracks) if tracks.is_empty() => {
                warn!(video_id = %video.id, "No caption tracks available");
                Vec::new()
            }
            Ok(tracks) => tracks.into_iter().map(|t| t.language).collect(),
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Caption listing failed");
                Vec::new()
            }
        };

        build_metadata_prompt(video, metrics.as_ref(), &caption_languages, &self.config)
    }

    async fn analyze_audio(&self, video: &SourceVideo) -> Option<ClipRecommendation> {
        let Some(audio) = &self.audio else {
            error!("Audio-grounded analysis requested without an audio fetcher");
            return None;
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.work_dir).await {
            error!(dir = %self.work_dir.display(), error = %e, "Cannot create work directory");
            return None;
        }

        let scratch = match tempfile::Builder::new()
            .prefix("vshorts-audio-")
            .tempdir_in(&self.work_dir)
        {
            Ok(dir) => dir,
            Err(e) => {
                error!(error = %e, "Cannot create scratch directory for audio");
                return None;
            }
        };

        let local = match audio.fetch_audio(&video.url, scratch.path()).await {
            Ok(path) => path,
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Audio download failed");
                return None;
            }
        };

        let file = match self.analysis.upload_file(&local, AUDIO_MIME_TYPE).await {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "Audio upload failed");
                remove_local(&local).await;
                return None;
            }
        };
        info!(file = %file.name, "Audio uploaded to analysis file store");

        let result = match self.wait_until_active(&file).await {
            Ok(()) => {
                let prompt = build_audio_prompt(video, &self.config);
                self.run_models(&prompt, Some(&file)).await
            }
            Err(e) => {
                warn!(file = %file.name, error = %e, "Uploaded audio never became usable");
                None
            }
        };

        self.cleanup(&file, &local).await;
        result
    }

    /// Poll the file store until the upload is processed or the deadline passes.
    async fn wait_until_active(&self, file: &FileRef) -> PipelineResult<()> {
        let deadline = Instant::now() + self.config.upload_timeout;

        loop {
            match self.analysis.file_state(file).await? {
                FileState::Active => return Ok(()),
                FileState::Failed => {
                    return Err(PipelineError::ai_failed(format!(
                        "file {} failed processing",
                        file.name
                    )))
                }
                FileState::Pending => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PipelineError::timeout(format!(
                    "file {} still processing after {:?}",
                    file.name, self.config.upload_timeout
                )));
            }
            let pause = self.config.upload_poll_interval.max(MIN_POLL_INTERVAL);
            sleep(pause.min(deadline - now)).await;
        }
    }

    /// Best effort; failures are logged and never affect the result.
    async fn cleanup(&self, file: &FileRef, local: &Path) {
        if let Err(e) = self.analysis.delete_file(file).await {
            warn!(file = %file.name, error = %e, "Failed to delete uploaded audio");
        }
        remove_local(local).await;
    }
}

async fn remove_local(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove local audio");
    }
}

fn output_instructions(config: &AnalysisConfig) -> String {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(ClipRecommendation))
        .unwrap_or_default();

    format!(
        r#"Rules:
- Do not pick anything from the first {intro} seconds (intro, music, waiting screen).
- The segment must last between {min} and {max} seconds.
- "viral_title" is short and catchy, in the language of the video.
- "rationale" explains in one sentence why the moment works as a short.

Return ONLY a single JSON object with "start_time" and "end_time" in seconds, matching this schema:
{schema}"#,
        intro = config.intro_skip_secs,
        min = config.min_clip_secs,
        max = config.max_clip_secs,
    )
}

fn build_metadata_prompt(
    video: &SourceVideo,
    metrics: Option<&VideoMetrics>,
    caption_languages: &[String],
    config: &AnalysisConfig,
) -> String {
    let mut evidence = format!("Title: {}\nChannel: {}\n", video.title, video.channel);

    if let Some(metrics) = metrics {
        if let Some(secs) = metrics.duration_secs() {
            evidence.push_str(&format!("Duration: {:.0} seconds\n", secs));
        }
        evidence.push_str(&format!(
            "Views: {}\nLikes: {}\nDescription:\n{}\n",
            metrics.view_count, metrics.like_count, metrics.description_excerpt
        ));
    }

    if !caption_languages.is_empty() {
        evidence.push_str(&format!("Caption languages: {}\n", caption_languages.join(", ")));
    }

    format!(
        "You are an expert editor of viral short-form videos. You cannot watch this stream, \
         so infer from the metadata below the moment most likely to go viral.\n\n{}\n{}",
        evidence,
        output_instructions(config)
    )
}

fn build_audio_prompt(video: &SourceVideo, config: &AnalysisConfig) -> String {
    format!(
        "You are an expert editor of viral short-form videos. Listen to the attached audio of \
         \"{}\" by {} and find the single funniest, most surprising or most intense moment.\n\n{}",
        video.title,
        video.channel,
        output_instructions(config)
    )
}
