//! End-to-end run orchestration.
//!
//! Stages run strictly in sequence: select, analyze, render, publish.
//! A stage that yields nothing ends the run quietly; no stage is retried here.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::Instrument;
use vshorts_clients::{
    AnalysisService, ArtifactFetcher, AudioFetcher, CatalogService, PublishingService,
    RenderService,
};
use vshorts_models::RunId;

use crate::analyzer::ClipAnalyzer;
use crate::config::PipelineConfig;
use crate::credentials::CredentialResolver;
use crate::logging::RunLogger;
use crate::metrics::record_run;
use crate::publisher::{short_url, Publisher};
use crate::render::RenderCoordinator;
use crate::selector::CandidateSelector;

/// External collaborators a run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogService>,
    pub analysis: Arc<dyn AnalysisService>,
    pub renderer: Arc<dyn RenderService>,
    pub publishing: Arc<dyn PublishingService>,
    /// Only needed by the audio-grounded analysis strategy
    pub audio: Option<Arc<dyn AudioFetcher>>,
    pub artifacts: Arc<dyn ArtifactFetcher>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoCandidate,
    AnalysisFailed,
    RenderFailed,
    /// Rendered but not published (dry run)
    DryRun { artifact_url: String },
    PublishFailed,
    Published { video_id: String },
}

impl RunOutcome {
    pub fn published_id(&self) -> Option<&str> {
        match self {
            RunOutcome::Published { video_id } => Some(video_id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::NoCandidate => "no_candidate",
            RunOutcome::AnalysisFailed => "analysis_failed",
            RunOutcome::RenderFailed => "render_failed",
            RunOutcome::DryRun { .. } => "dry_run",
            RunOutcome::PublishFailed => "publish_failed",
            RunOutcome::Published { .. } => "published",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description attached to every published short.
pub fn format_description(viral_title: &str, channel: &str) -> String {
    format!(
        "{}\n\n#shorts #viral #clips\n\nCredits: {}",
        viral_title, channel
    )
}

pub struct Pipeline {
    selector: CandidateSelector,
    analyzer: ClipAnalyzer,
    renderer: RenderCoordinator,
    publisher: Publisher,
    channels: Vec<String>,
    dry_run: bool,
}

impl Pipeline {
    /// Wire every stage from one configuration object.
    pub fn new(config: PipelineConfig, services: Collaborators) -> Self {
        let selector = CandidateSelector::new(services.catalog.clone(), config.selection.clone());

        let mut analyzer = ClipAnalyzer::new(
            services.analysis,
            services.catalog,
            config.analysis,
            config.work_dir.clone(),
        );
        if let Some(audio) = services.audio {
            analyzer = analyzer.with_audio_fetcher(audio);
        }

        let renderer = RenderCoordinator::new(services.renderer, config.render);

        let publisher = Publisher::new(
            CredentialResolver::from_config(&config.publish),
            services.publishing,
            services.artifacts,
            config.publish.clone(),
            config.work_dir,
        );

        Self::from_parts(
            selector,
            analyzer,
            renderer,
            publisher,
            config.selection.channels,
            config.publish.dry_run,
        )
    }

    pub fn from_parts(
        selector: CandidateSelector,
        analyzer: ClipAnalyzer,
        renderer: RenderCoordinator,
        publisher: Publisher,
        channels: Vec<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            selector,
            analyzer,
            renderer,
            publisher,
            channels,
            dry_run,
        }
    }

    /// Execute one run. Never errors; the outcome says where it stopped.
    pub async fn run(&self) -> RunOutcome {
        let run_id = RunId::new();
        let started = Instant::now();
        let logger = RunLogger::new(&run_id, "run");
        logger.entered(&format!("watching {} channels", self.channels.len()));

        let outcome = self.run_stages(&logger).instrument(logger.span()).await;

        record_run(logger.run_id(), outcome.as_str(), started.elapsed());
        if let RunOutcome::Published { video_id } = &outcome {
            logger.produced(&short_url(video_id));
        }
        outcome
    }

    async fn run_stages(&self, logger: &RunLogger) -> RunOutcome {
        let select = logger.for_stage("select");
        let Some(video) = self
            .selector
            .select_candidate(&self.channels)
            .instrument(select.span())
            .await
        else {
            select.came_up_empty("no candidate video found");
            return RunOutcome::NoCandidate;
        };
        select.produced(&format!("{} ({})", video.title, video.id));

        let analyze = logger.for_stage("analyze");
        let Some(clip) = self
            .analyzer
            .analyze(&video)
            .instrument(analyze.span())
            .await
        else {
            analyze.came_up_empty("no clip recommendation");
            return RunOutcome::AnalysisFailed;
        };
        analyze.produced(&format!(
            "{:.1}s to {:.1}s \"{}\"",
            clip.start_time, clip.end_time, clip.viral_title
        ));

        let render = logger.for_stage("render");
        let Some(artifact_url) = self
            .renderer
            .render(&video.id, &clip)
            .instrument(render.span())
            .await
        else {
            render.came_up_empty("no rendered artifact");
            return RunOutcome::RenderFailed;
        };
        render.produced(&artifact_url);

        if self.dry_run {
            logger.note("dry run, skipping publish");
            return RunOutcome::DryRun { artifact_url };
        }

        let publish = logger.for_stage("publish");
        let description = format_description(&clip.viral_title, &video.channel);
        match self
            .publisher
            .publish(&artifact_url, &clip.viral_title, &description)
            .instrument(publish.span())
            .await
        {
            Some(video_id) => {
                publish.produced(&video_id);
                RunOutcome::Published { video_id }
            }
            None => {
                publish.fell_through("upload did not complete");
                RunOutcome::PublishFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_format() {
        assert_eq!(
            format_description("Se cae de la silla", "Ibai Llanos"),
            "Se cae de la silla\n\n#shorts #viral #clips\n\nCredits: Ibai Llanos"
        );
    }

    #[test]
    fn test_outcome_published_id() {
        let published = RunOutcome::Published {
            video_id: "yt1".to_string(),
        };
        assert_eq!(published.published_id(), Some("yt1"));
        assert_eq!(RunOutcome::NoCandidate.published_id(), None);
        assert_eq!(RunOutcome::RenderFailed.as_str(), "render_failed");
    }
}
