//! Resilient clip pipeline.
//!
//! This crate provides:
//! - Explicit run configuration
//! - Credential resolution chain
//! - Candidate selection with injectable randomness
//! - Clip analysis with model fallback
//! - Tiered rendering with deadlines
//! - Publishing and run orchestration
//! - One-time OAuth consent producing the publishing token

pub mod analyzer;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
pub mod render;
pub mod retry;
pub mod selector;

pub use analyzer::{ClipAnalyzer, FailureKind};
pub use config::{
    AnalysisConfig, AnalysisStrategy, PipelineConfig, PublishConfig, RenderConfig,
    SelectionConfig, SelectionStrategy,
};
pub use credentials::{
    CredentialError, CredentialResolver, CredentialSource, EnvCredentialSource,
    FileCredentialSource, SourceOutcome,
};
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use pipeline::{format_description, Collaborators, Pipeline, RunOutcome};
pub use publisher::Publisher;
pub use render::RenderCoordinator;
pub use selector::CandidateSelector;
