//! Installed-app OAuth consent for the publishing account.
//!
//! Turns a downloaded OAuth client secret into the authorized-user JSON the
//! pipeline reads from `token.json` or `YOUTUBE_TOKEN_JSON`:
//! - Consent URL for a loopback redirect
//! - Authorization-code exchange for a refresh token

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use vshorts_models::{DEFAULT_TOKEN_URI, YOUTUBE_UPLOAD_SCOPE};

use crate::error::{ClientError, ClientResult};

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// OAuth client registration as downloaded from the cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The console wraps the registration in `installed` or `web`.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn from_json(raw: &str) -> ClientResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(raw)?;
        file.installed.or(file.web).ok_or_else(|| {
            ClientError::config_error("client secret has neither an 'installed' nor a 'web' section")
        })
    }
}

/// Authorized-user credential blob, the format the credential chain reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    pub token: String,
    pub refresh_token: String,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub expiry: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

/// Consent and code exchange for one OAuth client.
pub struct InstalledAppFlow {
    http: Client,
    secret: ClientSecret,
}

impl InstalledAppFlow {
    pub fn new(secret: ClientSecret) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("vshorts-clients/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, secret })
    }

    /// URL the account owner opens to grant upload access.
    ///
    /// `access_type=offline` with `prompt=consent` makes the provider issue a
    /// refresh token even when the account consented before.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> ClientResult<String> {
        let mut url = Url::parse(&self.secret.auth_uri)
            .map_err(|e| ClientError::config_error(format!("invalid auth_uri: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.secret.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", YOUTUBE_UPLOAD_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Trade the authorization code for tokens.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> ClientResult<AuthorizedUser> {
        let response = self
            .http
            .post(&self.secret.token_uri)
            .form(&[
                ("code", code),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::AuthError(format!(
                "Code exchange returned {}: {}",
                status, body
            )));
        }

        let tokens: CodeExchangeResponse = response.json().await?;
        let refresh_token = tokens.refresh_token.ok_or_else(|| {
            ClientError::AuthError("provider issued no refresh token; revoke access and retry".to_string())
        })?;
        debug!("Authorization code exchanged");

        let scopes = tokens
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| vec![YOUTUBE_UPLOAD_SCOPE.to_string()]);

        Ok(AuthorizedUser {
            token: tokens.access_token,
            refresh_token,
            token_uri: self.secret.token_uri.clone(),
            client_id: self.secret.client_id.clone(),
            client_secret: self.secret.client_secret.clone(),
            scopes,
            expiry: Utc::now() + chrono::Duration::seconds(tokens.expires_in.unwrap_or(3600)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = r#"{"installed": {
        "client_id": "cid.apps.googleusercontent.com",
        "client_secret": "csecret",
        "redirect_uris": ["http://localhost"]
    }}"#;

    fn flow_against(server: &MockServer) -> InstalledAppFlow {
        let mut secret = ClientSecret::from_json(SECRET).unwrap();
        secret.token_uri = format!("{}/token", server.uri());
        InstalledAppFlow::new(secret).unwrap()
    }

    #[test]
    fn test_client_secret_sections() {
        let secret = ClientSecret::from_json(SECRET).unwrap();
        assert_eq!(secret.client_id, "cid.apps.googleusercontent.com");
        assert_eq!(secret.token_uri, DEFAULT_TOKEN_URI);

        let web = ClientSecret::from_json(r#"{"web": {"client_id": "w", "client_secret": "s"}}"#).unwrap();
        assert_eq!(web.client_id, "w");

        assert!(matches!(
            ClientSecret::from_json(r#"{"other": {}}"#),
            Err(ClientError::ConfigError(_))
        ));
    }

    #[test]
    fn test_authorization_url_requests_offline_upload_scope() {
        let flow = InstalledAppFlow::new(ClientSecret::from_json(SECRET).unwrap()).unwrap();
        let raw = flow.authorization_url("http://127.0.0.1:8765/", "st4te").unwrap();
        let url = Url::parse(&raw).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(raw.starts_with(DEFAULT_AUTH_URI));
        assert_eq!(pairs["scope"], YOUTUBE_UPLOAD_SCOPE);
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8765/");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["state"], "st4te");
    }

    #[tokio::test]
    async fn test_exchange_code_builds_authorized_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=4%2Fabc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "refresh_token": "1//refresh",
                "expires_in": 3599,
                "scope": YOUTUBE_UPLOAD_SCOPE,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let user = flow_against(&server)
            .exchange_code("4/abc", "http://127.0.0.1:8765/")
            .await
            .unwrap();

        assert_eq!(user.refresh_token, "1//refresh");
        assert_eq!(user.client_secret, "csecret");
        assert_eq!(user.scopes, vec![YOUTUBE_UPLOAD_SCOPE.to_string()]);
        assert!(user.expiry > Utc::now());
    }

    #[tokio::test]
    async fn test_exchange_without_refresh_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        let err = flow_against(&server)
            .exchange_code("code", "http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthError(_)));
    }

    #[tokio::test]
    async fn test_rejected_code_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#))
            .mount(&server)
            .await;

        let err = flow_against(&server)
            .exchange_code("stale", "http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
