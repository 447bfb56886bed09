use std::path::Path;

use vshorts_clients::{AnalysisService, GeminiClient, GeminiConfig};
use vshorts_pipeline::{AnalysisStrategy, CredentialResolver, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env()?;

    println!(
        "vshorts-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;

    if config.analysis.strategy == AnalysisStrategy::AudioGrounded {
        ensure_yt_dlp()?;
    }

    ensure_models_reachable(&config.gemini_api_key).await?;

    CredentialResolver::from_config(&config.publish)
        .resolve()
        .map_err(|e| anyhow::anyhow!("publishing credentials unusable: {}", e))?;

    println!("vshorts-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path.as_ref()).await?;
    Ok(())
}

fn ensure_yt_dlp() -> anyhow::Result<()> {
    which::which("yt-dlp").map_err(|e| anyhow::anyhow!("yt-dlp not available: {}", e))?;
    Ok(())
}

async fn ensure_models_reachable(api_key: &str) -> anyhow::Result<()> {
    let client = GeminiClient::new(GeminiConfig::new(api_key))?;
    let models = client.list_models().await?;
    if models.is_empty() {
        return Err(anyhow::anyhow!("no generation models available"));
    }
    println!("vshorts-selfcheck: {} generation models reachable", models.len());
    Ok(())
}
