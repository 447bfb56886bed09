//! One-time authorization of the publishing account.
//!
//! Runs the installed-app consent flow over a loopback redirect and stores
//! the resulting authorized-user blob where the credential chain looks for it.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;
use vshorts_clients::{AuthorizedUser, ClientError, InstalledAppFlow};

use crate::credentials::{credentials_from_json, CredentialError};

/// How long the loopback listener waits for the browser redirect.
pub const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PAGE: &str = "<html><body><h3>vshorts: authorization received. You can close this tab.</h3></body></html>";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error("Redirect state did not match this session")]
    StateMismatch,

    #[error("Redirect carried no authorization code")]
    MissingCode,

    #[error("Malformed redirect request: {0}")]
    BadRequest(String),

    #[error("No redirect received within {0:?}")]
    TimedOut(Duration),

    #[error("Issued token is unusable: {0}")]
    Unusable(#[from] CredentialError),

    #[error("Provider error: {0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extract the authorization code from the redirect's request line
/// (`GET /?state=..&code=.. HTTP/1.1`).
pub fn parse_callback(request_line: &str, expected_state: &str) -> Result<String, AuthError> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| AuthError::BadRequest(request_line.trim().to_string()))?;
    let url = Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(target))
        .map_err(|e| AuthError::BadRequest(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(AuthError::Denied(value.into_owned())),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    code.filter(|c| !c.is_empty()).ok_or(AuthError::MissingCode)
}

/// Loopback listener the consent page redirects to.
pub struct LoopbackRedirect {
    listener: TcpListener,
    redirect_uri: String,
}

impl LoopbackRedirect {
    /// Bind an ephemeral port on 127.0.0.1.
    pub async fn bind() -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{}/", port),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serve redirects until one carries a code for `expected_state`.
    ///
    /// Stray requests (favicon, wrong state) are answered and ignored; an
    /// explicit denial ends the wait.
    pub async fn wait_for_code(&self, expected_state: &str, timeout: Duration) -> Result<String, AuthError> {
        tokio::time::timeout(timeout, self.accept_until_code(expected_state))
            .await
            .map_err(|_| AuthError::TimedOut(timeout))?
    }

    async fn accept_until_code(&self, expected_state: &str) -> Result<String, AuthError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).await?;
            let mut header = String::new();
            while reader.read_line(&mut header).await? > 0 && !header.trim().is_empty() {
                header.clear();
            }
            debug!(peer = %peer, "Redirect request received");

            let result = parse_callback(&request_line, expected_state);
            let (status, body) = match &result {
                Ok(_) => ("200 OK", CALLBACK_PAGE.to_string()),
                Err(e) => ("400 Bad Request", format!("<html><body>{}</body></html>", e)),
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            if let Err(e) = stream.write_all(response.as_bytes()).await {
                warn!(error = %e, "Could not answer redirect request");
            }
            let _ = stream.shutdown().await;

            match result {
                Ok(code) => return Ok(code),
                Err(AuthError::Denied(reason)) => return Err(AuthError::Denied(reason)),
                Err(e) => warn!(error = %e, "Ignoring redirect request"),
            }
        }
    }
}

/// Serialize the blob, check it the same way the pipeline will, and write it.
pub async fn write_token_file(path: &Path, user: &AuthorizedUser) -> Result<String, AuthError> {
    let value = serde_json::to_value(user)?;
    credentials_from_json(&value)?;

    let json = serde_json::to_string_pretty(&value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &json).await?;
    info!(path = %path.display(), "Publishing token written");
    Ok(json)
}

/// Full consent flow: hand the consent URL to `show_url`, wait for the
/// redirect, exchange the code and store the token. Returns the stored JSON.
pub async fn authorize<F>(flow: &InstalledAppFlow, token_path: &Path, show_url: F) -> Result<String, AuthError>
where
    F: FnOnce(&str),
{
    let redirect = LoopbackRedirect::bind().await?;
    let state = Uuid::new_v4().simple().to_string();
    let url = flow.authorization_url(redirect.redirect_uri(), &state)?;
    show_url(&url);

    let code = redirect.wait_for_code(&state, CONSENT_TIMEOUT).await?;
    let user = flow.exchange_code(&code, redirect.redirect_uri()).await?;
    write_token_file(token_path, &user).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;
    use vshorts_models::YOUTUBE_UPLOAD_SCOPE;

    #[test]
    fn test_parse_callback_returns_code() {
        let code = parse_callback("GET /?state=s1&code=4%2F0Abc&scope=x HTTP/1.1\r\n", "s1").unwrap();
        assert_eq!(code, "4/0Abc");
    }

    #[test]
    fn test_parse_callback_rejects_foreign_state() {
        assert!(matches!(
            parse_callback("GET /?state=other&code=c HTTP/1.1", "s1"),
            Err(AuthError::StateMismatch)
        ));
    }

    #[test]
    fn test_parse_callback_reports_denial() {
        assert!(matches!(
            parse_callback("GET /?error=access_denied&state=s1 HTTP/1.1", "s1"),
            Err(AuthError::Denied(reason)) if reason == "access_denied"
        ));
    }

    #[test]
    fn test_parse_callback_favicon_has_no_code() {
        assert!(parse_callback("GET /favicon.ico HTTP/1.1", "s1").is_err());
        assert!(matches!(parse_callback("", "s1"), Err(AuthError::BadRequest(_))));
    }

    async fn send(uri: &str, target: &str) -> String {
        let addr = uri.trim_start_matches("http://").trim_end_matches('/');
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(format!("GET {} HTTP/1.1\r\nHost: {}\r\n\r\n", target, addr).as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_loopback_skips_stray_requests() {
        let redirect = LoopbackRedirect::bind().await.unwrap();
        let uri = redirect.redirect_uri().to_string();

        let browser = tokio::spawn(async move {
            let stray = send(&uri, "/favicon.ico").await;
            let good = send(&uri, "/?state=s1&code=abc").await;
            (stray, good)
        });

        let code = redirect.wait_for_code("s1", Duration::from_secs(5)).await.unwrap();
        let (stray, good) = browser.await.unwrap();

        assert_eq!(code, "abc");
        assert!(stray.starts_with("HTTP/1.1 400"));
        assert!(good.starts_with("HTTP/1.1 200"));
    }

    #[tokio::test]
    async fn test_loopback_times_out() {
        let redirect = LoopbackRedirect::bind().await.unwrap();
        let err = redirect
            .wait_for_code("s1", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TimedOut(_)));
    }

    fn user() -> AuthorizedUser {
        AuthorizedUser {
            token: "ya29.fresh".to_string(),
            refresh_token: "1//refresh".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            scopes: vec![YOUTUBE_UPLOAD_SCOPE.to_string()],
            expiry: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_written_token_feeds_file_source() {
        use crate::credentials::{CredentialSource, FileCredentialSource, SourceOutcome};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");

        write_token_file(&path, &user()).await.unwrap();

        match FileCredentialSource::new(path.clone()).load() {
            SourceOutcome::Found(creds) => {
                assert_eq!(creds.refresh_token, "1//refresh");
                assert_eq!(creds.client_id, "cid");
            }
            other => panic!("token file not accepted: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_token_without_upload_scope_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let mut user = user();
        user.scopes = vec!["https://www.googleapis.com/auth/youtube.readonly".to_string()];

        let err = write_token_file(&path, &user).await.unwrap_err();

        assert!(matches!(err, AuthError::Unusable(_)));
        assert!(!path.exists());
    }
}
