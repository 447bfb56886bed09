//! One pipeline run: select, analyze, render, publish.

use std::sync::Arc;

use tracing::{error, info, warn};

use vshorts_clients::{
    AudioFetcher, CreatomateClient, CreatomateConfig, GeminiClient, GeminiConfig,
    HttpArtifactFetcher, YouTubeCatalogClient, YouTubeConfig, YouTubeUploadClient,
    YouTubeUploadConfig, YtDlpAudioFetcher,
};
use vshorts_pipeline::logging::init_tracing;
use vshorts_pipeline::{AnalysisStrategy, Collaborators, Pipeline, PipelineConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting vshorts run");

    let config = match PipelineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let services = match build_collaborators(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create service clients: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = Pipeline::new(config, services);
    let outcome = pipeline.run().await;

    match outcome.published_id() {
        Some(id) => info!(video_id = %id, "Run finished"),
        None => warn!(outcome = %outcome, "Run finished without publishing"),
    }
}

fn build_collaborators(config: &PipelineConfig) -> Result<Collaborators, vshorts_clients::ClientError> {
    let audio: Option<Arc<dyn AudioFetcher>> = match config.analysis.strategy {
        AnalysisStrategy::AudioGrounded => Some(Arc::new(YtDlpAudioFetcher::new()?)),
        AnalysisStrategy::MetadataOnly => None,
    };

    Ok(Collaborators {
        catalog: Arc::new(YouTubeCatalogClient::new(YouTubeConfig::new(
            config.youtube_api_key.clone(),
        ))?),
        analysis: Arc::new(GeminiClient::new(GeminiConfig::new(
            config.gemini_api_key.clone(),
        ))?),
        renderer: Arc::new(CreatomateClient::new(CreatomateConfig::new(
            config.creatomate_api_key.clone(),
        ))?),
        publishing: Arc::new(YouTubeUploadClient::new(YouTubeUploadConfig::default())?),
        audio,
        artifacts: Arc::new(HttpArtifactFetcher::new(config.publish.download_timeout)?),
    })
}
