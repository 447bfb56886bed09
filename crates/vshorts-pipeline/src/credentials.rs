//! Publishing credential resolution.
//!
//! Credentials come from an ordered chain of sources. Each source reports
//! one of three outcomes:
//! - `Found`: valid credentials, resolution stops
//! - `Invalid`: data was present but unusable, resolution fails
//! - `Absent`: nothing usable here, try the next source
//!
//! The environment source treats malformed JSON as absent so a broken
//! secret does not mask a valid local file.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use vshorts_models::{Credentials, DEFAULT_TOKEN_URI, YOUTUBE_UPLOAD_SCOPE};

use crate::config::PublishConfig;
use crate::metrics::record_credential_resolution;

/// Fields every credential blob must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["client_id", "client_secret", "refresh_token"];

/// Scopes that include permission to upload videos.
const UPLOAD_CAPABLE_SCOPES: &[&str] = &[
    YOUTUBE_UPLOAD_SCOPE,
    "https://www.googleapis.com/auth/youtube",
    "https://www.googleapis.com/auth/youtube.force-ssl",
];

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential file not found: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("Credential file {} is unreadable: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Credential data from {origin} is not valid JSON: {message}")]
    MalformedJson { origin: String, message: String },

    #[error("Credential data is missing required fields: {0:?}")]
    MissingFields(Vec<String>),

    #[error("Credential token is incompatible: {0}")]
    IncompatibleToken(String),

    #[error("No credential source is configured")]
    NoSource,
}

/// Outcome of asking one source for credentials.
#[derive(Debug)]
pub enum SourceOutcome {
    Found(Credentials),
    Invalid(CredentialError),
    Absent,
}

/// One link in the credential chain.
pub trait CredentialSource: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &str;

    fn load(&self) -> SourceOutcome;
}

/// Credential blob held in an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    var_name: String,
    /// `None` reads the process environment on every `load`
    pinned: Option<Option<String>>,
}

impl EnvCredentialSource {
    /// Read `var_name` from the process environment when asked to load.
    pub fn from_env(var_name: &str) -> Self {
        Self {
            var_name: var_name.to_string(),
            pinned: None,
        }
    }

    /// Use a fixed value instead of the process environment.
    pub fn new(var_name: &str, value: Option<String>) -> Self {
        Self {
            var_name: var_name.to_string(),
            pinned: Some(value),
        }
    }

    fn current_value(&self) -> Option<String> {
        match &self.pinned {
            Some(value) => value.clone(),
            None => std::env::var(&self.var_name).ok(),
        }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn name(&self) -> &str {
        "env"
    }

    fn load(&self) -> SourceOutcome {
        let value = self.current_value();
        let raw = match value.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                debug!(var = %self.var_name, "Credential variable not set");
                return SourceOutcome::Absent;
            }
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(value) => match credentials_from_json(&value) {
                Ok(creds) => SourceOutcome::Found(creds),
                Err(e) => SourceOutcome::Invalid(e),
            },
            Err(e) => {
                warn!(
                    var = %self.var_name,
                    error = %e,
                    "Credential variable is not valid JSON, trying next source"
                );
                SourceOutcome::Absent
            }
        }
    }
}

/// Credential blob stored in a local file.
#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    path: PathBuf,
}

impl FileCredentialSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for FileCredentialSource {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self) -> SourceOutcome {
        if !self.path.exists() {
            return SourceOutcome::Invalid(CredentialError::FileMissing(self.path.clone()));
        }

        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) => {
                return SourceOutcome::Invalid(CredentialError::FileUnreadable {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                return SourceOutcome::Invalid(CredentialError::MalformedJson {
                    origin: self.path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };

        match credentials_from_json(&value) {
            Ok(creds) => SourceOutcome::Found(creds),
            Err(e) => SourceOutcome::Invalid(e),
        }
    }
}

/// Validate a credential blob and build upload-scoped credentials.
///
/// All missing required fields are reported together.
pub fn credentials_from_json(value: &Value) -> Result<Credentials, CredentialError> {
    let object = value.as_object().ok_or_else(|| CredentialError::MalformedJson {
        origin: "credential blob".to_string(),
        message: "expected a JSON object".to_string(),
    })?;

    let mut missing = Vec::new();
    let mut mistyped = Vec::new();

    for field in REQUIRED_FIELDS {
        match object.get(field) {
            None | Some(Value::Null) => missing.push(field.to_string()),
            Some(Value::String(s)) if s.trim().is_empty() => missing.push(field.to_string()),
            Some(Value::String(_)) => {}
            Some(_) => mistyped.push(field),
        }
    }

    if !missing.is_empty() {
        return Err(CredentialError::MissingFields(missing));
    }
    if !mistyped.is_empty() {
        return Err(CredentialError::IncompatibleToken(format!(
            "fields {:?} must be strings",
            mistyped
        )));
    }

    validate_scopes(object.get("scopes").or_else(|| object.get("scope")))?;
    let token_uri = validate_token_uri(object.get("token_uri"))?;

    let field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    Ok(Credentials::new(field("client_id"), field("client_secret"), field("refresh_token"))
        .with_token_uri(token_uri))
}

fn validate_scopes(scopes: Option<&Value>) -> Result<(), CredentialError> {
    let scopes: Vec<&str> = match scopes {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::String(s)) => s.split_whitespace().collect(),
        Some(Value::Array(items)) => {
            let strings: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            strings.ok_or_else(|| {
                CredentialError::IncompatibleToken("scopes must contain only strings".to_string())
            })?
        }
        Some(_) => {
            return Err(CredentialError::IncompatibleToken(
                "scopes must be a string or an array of strings".to_string(),
            ))
        }
    };

    if scopes.is_empty() || scopes.iter().any(|s| UPLOAD_CAPABLE_SCOPES.contains(s)) {
        Ok(())
    } else {
        Err(CredentialError::IncompatibleToken(format!(
            "scopes {:?} do not grant {}",
            scopes, YOUTUBE_UPLOAD_SCOPE
        )))
    }
}

fn validate_token_uri(token_uri: Option<&Value>) -> Result<String, CredentialError> {
    match token_uri {
        None | Some(Value::Null) => Ok(DEFAULT_TOKEN_URI.to_string()),
        Some(Value::String(raw)) => match url::Url::parse(raw.trim()) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed.to_string()),
            _ => Err(CredentialError::IncompatibleToken(format!(
                "token_uri '{}' is not an HTTP(S) URL",
                raw
            ))),
        },
        Some(_) => Err(CredentialError::IncompatibleToken(
            "token_uri must be a string".to_string(),
        )),
    }
}

/// Ordered credential chain; the first source reporting `Found` wins.
pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialResolver {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Environment blob first, then the local token file.
    pub fn from_config(config: &PublishConfig) -> Self {
        Self::new(vec![
            Box::new(EnvCredentialSource::from_env(&config.token_env_var)),
            Box::new(FileCredentialSource::new(config.token_file.clone())),
        ])
    }

    pub fn resolve(&self) -> Result<Credentials, CredentialError> {
        for source in &self.sources {
            match source.load() {
                SourceOutcome::Found(creds) => {
                    info!(source = source.name(), "Resolved publishing credentials");
                    record_credential_resolution(source.name(), "found");
                    return Ok(creds);
                }
                SourceOutcome::Invalid(e) => {
                    record_credential_resolution(source.name(), "invalid");
                    return Err(e);
                }
                SourceOutcome::Absent => {
                    record_credential_resolution(source.name(), "absent");
                }
            }
        }

        Err(CredentialError::NoSource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"{
        "token": "ya29.old",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "client.apps.googleusercontent.com",
        "client_secret": "shh",
        "scopes": ["https://www.googleapis.com/auth/youtube.upload"],
        "expiry": "2024-01-01T00:00:00Z"
    }"#;

    fn token_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn resolver(env: Option<&str>, file: PathBuf) -> CredentialResolver {
        CredentialResolver::new(vec![
            Box::new(EnvCredentialSource::new("YOUTUBE_TOKEN_JSON", env.map(str::to_string))),
            Box::new(FileCredentialSource::new(file)),
        ])
    }

    #[test]
    fn test_env_source_wins() {
        let creds = resolver(Some(VALID), PathBuf::from("/nonexistent/token.json"))
            .resolve()
            .unwrap();
        assert_eq!(creds.client_id, "client.apps.googleusercontent.com");
        assert_eq!(creds.scope, YOUTUBE_UPLOAD_SCOPE);
    }

    #[test]
    fn test_malformed_env_falls_through_to_file() {
        let file = token_file(VALID);
        let creds = resolver(Some("{not json"), file.path().to_path_buf())
            .resolve()
            .unwrap();
        assert_eq!(creds.refresh_token, "1//refresh");
    }

    #[test]
    fn test_env_variable_read_at_load_time() {
        let var = "VSHORTS_TEST_LATE_TOKEN_JSON";
        std::env::remove_var(var);
        let source = EnvCredentialSource::from_env(var);
        assert!(matches!(source.load(), SourceOutcome::Absent));

        std::env::set_var(var, VALID);
        let outcome = source.load();
        std::env::remove_var(var);

        assert!(matches!(outcome, SourceOutcome::Found(_)));
    }

    #[test]
    fn test_blank_env_is_absent() {
        let file = token_file(VALID);
        assert!(resolver(Some("   "), file.path().to_path_buf()).resolve().is_ok());
    }

    #[test]
    fn test_missing_refresh_token_named_exactly() {
        let blob = r#"{"client_id": "id", "client_secret": "secret"}"#;
        match resolver(Some(blob), PathBuf::from("/nonexistent")).resolve() {
            Err(CredentialError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["refresh_token".to_string()])
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_all_missing_fields_reported() {
        match resolver(Some(r#"{"client_id": ""}"#), PathBuf::from("/nonexistent")).resolve() {
            Err(CredentialError::MissingFields(fields)) => assert_eq!(
                fields,
                vec!["client_id", "client_secret", "refresh_token"]
            ),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_definitive() {
        let err = resolver(None, PathBuf::from("/nonexistent/token.json"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, CredentialError::FileMissing(_)));
    }

    #[test]
    fn test_malformed_file_is_definitive() {
        let file = token_file("{\"client_id\": ");
        let err = resolver(None, file.path().to_path_buf()).resolve().unwrap_err();
        assert!(matches!(err, CredentialError::MalformedJson { .. }));
    }

    #[test]
    fn test_unreadable_file_is_definitive() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file.
        let err = resolver(None, dir.path().to_path_buf()).resolve().unwrap_err();
        assert!(matches!(err, CredentialError::FileUnreadable { .. }));
    }

    #[test]
    fn test_wrong_scope_shape_is_incompatible() {
        let blob = r#"{"client_id": "a", "client_secret": "b", "refresh_token": "c", "scopes": {"upload": true}}"#;
        let err = resolver(Some(blob), PathBuf::from("/nonexistent")).resolve().unwrap_err();
        assert!(matches!(err, CredentialError::IncompatibleToken(_)));
    }

    #[test]
    fn test_scope_without_upload_is_incompatible() {
        let blob = r#"{"client_id": "a", "client_secret": "b", "refresh_token": "c", "scopes": "https://www.googleapis.com/auth/youtube.readonly"}"#;
        let err = resolver(Some(blob), PathBuf::from("/nonexistent")).resolve().unwrap_err();
        assert!(matches!(err, CredentialError::IncompatibleToken(_)));
    }

    #[test]
    fn test_non_http_token_uri_is_incompatible() {
        let blob = r#"{"client_id": "a", "client_secret": "b", "refresh_token": "c", "token_uri": "file:///etc/passwd"}"#;
        let err = resolver(Some(blob), PathBuf::from("/nonexistent")).resolve().unwrap_err();
        assert!(matches!(err, CredentialError::IncompatibleToken(_)));
    }

    #[test]
    fn test_numeric_field_is_incompatible() {
        let blob = r#"{"client_id": 42, "client_secret": "b", "refresh_token": "c"}"#;
        let err = resolver(Some(blob), PathBuf::from("/nonexistent")).resolve().unwrap_err();
        assert!(matches!(err, CredentialError::IncompatibleToken(_)));
    }

    #[test]
    fn test_default_token_uri_applied() {
        let blob = r#"{"client_id": "a", "client_secret": "b", "refresh_token": "c"}"#;
        let creds = credentials_from_json(&serde_json::from_str(blob).unwrap()).unwrap();
        assert_eq!(creds.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_empty_chain_reports_no_source() {
        assert!(matches!(
            CredentialResolver::new(Vec::new()).resolve(),
            Err(CredentialError::NoSource)
        ));
    }
}
