use std::path::PathBuf;

use vshorts_clients::{ClientSecret, InstalledAppFlow};
use vshorts_pipeline::auth::authorize;
use vshorts_pipeline::config::TOKEN_ENV_VAR;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;
    dotenvy::dotenv().ok();

    let secret_path = std::env::var("VSHORTS_CLIENT_SECRET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("client_secret.json"));
    let token_path = std::env::var("VSHORTS_TOKEN_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("token.json"));

    let raw = tokio::fs::read_to_string(&secret_path).await.map_err(|e| {
        anyhow::anyhow!(
            "cannot read OAuth client secret {} (desktop-app client JSON from the cloud console): {}",
            secret_path.display(),
            e
        )
    })?;
    let flow = InstalledAppFlow::new(ClientSecret::from_json(&raw)?)?;

    println!("vshorts-auth: waiting for consent (upload scope only)");
    authorize(&flow, &token_path, |url| {
        println!("Open this URL in a browser signed in to the publishing account:\n\n{}\n", url);
    })
    .await?;

    println!("vshorts-auth: wrote {}", token_path.display());
    println!(
        "vshorts-auth: keep it next to the vshorts binary, or store its contents in {}",
        TOKEN_ENV_VAR
    );
    Ok(())
}
