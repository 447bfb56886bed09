//! Creatomate render API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use vshorts_models::{RenderJobSpec, RenderState, RenderStatus};

use crate::error::{ClientError, ClientResult};
use crate::traits::RenderService;

/// Configuration for the render client.
#[derive(Debug, Clone)]
pub struct CreatomateConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl CreatomateConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.creatomate.com".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Render client submitting declarative compositions.
pub struct CreatomateClient {
    http: Client,
    config: CreatomateConfig,
}

#[derive(Debug, Deserialize)]
struct RenderResource {
    id: String,
    #[serde(default)]
    status: Option<RenderState>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// The submit endpoint answers with one render per output.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubmitResponse {
    Many(Vec<RenderResource>),
    One(RenderResource),
}

/// Translate a job spec into a Creatomate `source` composition.
pub fn composition_source(spec: &RenderJobSpec) -> Value {
    let mut elements = vec![json!({
        "id": spec.video.id,
        "type": "video",
        "source": spec.video.source_url,
        "trim_start": spec.video.trim_start,
        "trim_duration": spec.video.trim_duration,
        "fit": "cover",
    })];

    if let Some(captions) = &spec.captions {
        elements.push(json!({
            "type": "text",
            "transcript_source": captions.transcript_source,
            "transcript_effect": captions.effect,
            "transcript_maximum_length": 14,
            "y": "82%",
            "width": "81%",
            "height": "35%",
            "x_alignment": "50%",
            "y_alignment": "50%",
            "fill_color": "#ffffff",
            "stroke_color": "#333333",
            "stroke_width": "1.05 vmin",
            "font_family": "Montserrat",
            "font_weight": "700",
            "font_size": "8 vmin",
        }));
    }

    json!({
        "output_format": spec.output_format,
        "width": spec.width,
        "height": spec.height,
        "elements": elements,
    })
}

impl CreatomateClient {
    pub fn new(config: CreatomateConfig) -> ClientResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::config_error("Creatomate API key is empty"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vshorts-clients/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    fn renders_url(&self) -> String {
        format!("{}/v1/renders", self.config.base_url)
    }
}

#[async_trait]
impl RenderService for CreatomateClient {
    async fn submit(&self, spec: &RenderJobSpec) -> ClientResult<String> {
        debug!(tier = %spec.tier, captions = spec.has_captions(), "Submitting render job");

        let response = self
            .http
            .post(self.renders_url())
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "source": composition_source(spec) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let render = match response.json::<SubmitResponse>().await? {
            SubmitResponse::Many(renders) => renders.into_iter().next(),
            SubmitResponse::One(render) => Some(render),
        };

        render
            .map(|r| r.id)
            .ok_or_else(|| ClientError::invalid_response("Render submission returned no renders"))
    }

    async fn status(&self, job_id: &str) -> ClientResult<RenderStatus> {
        let response = self
            .http
            .get(format!("{}/{}", self.renders_url(), job_id))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let render: RenderResource = response.json().await?;
        Ok(RenderStatus {
            state: render.status.unwrap_or(RenderState::InProgress),
            url: render.url,
            error_message: render.error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vshorts_models::ClipWindow;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> ClipWindow {
        ClipWindow {
            start: 90.0,
            duration: 45.0,
        }
    }

    fn client(server: &MockServer) -> CreatomateClient {
        CreatomateClient::new(CreatomateConfig::new("ck").with_base_url(server.uri())).unwrap()
    }

    #[test]
    fn test_rich_source_binds_captions_to_video() {
        let spec = RenderJobSpec::rich("https://www.youtube.com/watch?v=x", window(), 1080, 1920);
        let source = composition_source(&spec);
        let elements = source["elements"].as_array().unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0]["trim_start"], 90.0);
        assert_eq!(elements[0]["trim_duration"], 45.0);
        assert_eq!(elements[1]["transcript_source"], elements[0]["id"]);
    }

    #[test]
    fn test_degraded_source_has_no_captions() {
        let spec = RenderJobSpec::degraded("https://www.youtube.com/watch?v=x", window(), 1080, 1920);
        let source = composition_source(&spec);
        assert_eq!(source["elements"].as_array().unwrap().len(), 1);
        assert_eq!(source["height"], 1920);
    }

    #[tokio::test]
    async fn test_submit_reads_first_render_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/renders"))
            .and(header("authorization", "Bearer ck"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!([
                {"id": "render-1", "status": "planned"}
            ])))
            .mount(&server)
            .await;

        let spec = RenderJobSpec::rich("https://www.youtube.com/watch?v=x", window(), 1080, 1920);
        assert_eq!(client(&server).submit(&spec).await.unwrap(), "render-1");
    }

    #[tokio::test]
    async fn test_submit_rejection_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/renders"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid source"))
            .mount(&server)
            .await;

        let spec = RenderJobSpec::rich("https://www.youtube.com/watch?v=x", window(), 1080, 1920);
        let err = client(&server).submit(&spec).await.unwrap_err();
        assert!(matches!(err, ClientError::RequestFailed(400, _)));
    }

    #[tokio::test]
    async fn test_status_maps_states() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/renders/render-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "render-1", "status": "succeeded", "url": "https://cdn.example/r.mp4"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/renders/render-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "render-2", "status": "rendering"
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let done = client.status("render-1").await.unwrap();
        assert_eq!(done.state, RenderState::Succeeded);
        assert_eq!(done.url.as_deref(), Some("https://cdn.example/r.mp4"));

        let pending = client.status("render-2").await.unwrap();
        assert_eq!(pending.state, RenderState::InProgress);
    }
}
