//! Service client error types.

use thiserror::Error;

/// Result type for service client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to an external service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Request failed ({0}): {1}")]
    RequestFailed(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("External process failed: {0}")]
    ProcessFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request URLs can carry signed query strings, so they are dropped.
impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.without_url())
    }
}

impl ClientError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn process_failed(msg: impl Into<String>) -> Self {
        Self::ProcessFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Map a non-success HTTP status and body into an error.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 => Self::RateLimited(body),
            404 => Self::NotFound(body),
            401 | 403 if body.contains("RESOURCE_EXHAUSTED") || body.contains("quotaExceeded") => {
                Self::RateLimited(body)
            }
            401 | 403 => Self::AuthError(body),
            500..=599 => Self::ServerError(status, body),
            _ => Self::RequestFailed(status, body),
        }
    }

    /// Read a failed response into an error, keeping the body as context.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::from_http_status(status, body)
    }

    /// "Too many requests" or quota exhaustion.
    pub fn is_rate_limited(&self) -> bool {
        if matches!(self, ClientError::RateLimited(_)) {
            return true;
        }
        let msg = self.to_string();
        msg.contains("RESOURCE_EXHAUSTED") || msg.to_lowercase().contains("quota")
    }

    /// Unknown model, file, render or video.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_)) || self.to_string().contains("NOT_FOUND")
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RateLimited(_) | ClientError::ServerError(_, _) => true,
            ClientError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_429() {
        let err = ClientError::from_http_status(429, "Too Many Requests");
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
        assert!(matches!(err, ClientError::RateLimited(_)));
    }

    #[test]
    fn test_from_http_status_404() {
        let err = ClientError::from_http_status(404, "models/gemini-x is not found");
        assert!(err.is_not_found());
        assert!(!err.is_rate_limited());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_quota_body_on_403_is_rate_limited() {
        let err = ClientError::from_http_status(403, r#"{"reason": "quotaExceeded"}"#);
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_resource_exhausted_message_is_rate_limited() {
        let err = ClientError::from_http_status(400, "status: RESOURCE_EXHAUSTED");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_server_error_retryable() {
        let err = ClientError::from_http_status(503, "unavailable");
        assert!(matches!(err, ClientError::ServerError(503, _)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_bad_request_not_retryable() {
        let err = ClientError::from_http_status(400, "bad request");
        assert!(matches!(err, ClientError::RequestFailed(400, _)));
        assert!(!err.is_retryable());
    }
}
