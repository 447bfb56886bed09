//! Analysis model candidates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model identifiers tried when the live catalog cannot be listed.
pub const FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
    "gemini-2.5-pro",
];

/// Preference tier of an analysis model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheaper/faster models, tried first
    Fast,
    /// Everything else
    Other,
}

impl ModelTier {
    /// Classify a model identifier by name heuristics.
    pub fn classify(model_id: &str) -> Self {
        let id = model_id.to_lowercase();
        if id.contains("flash") || id.contains("lite") {
            ModelTier::Fast
        } else {
            ModelTier::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Other => "other",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An analysis backend identifier with its preference rank.
///
/// Rebuilt each run; lower `rank` is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelCandidate {
    pub id: String,
    pub tier: ModelTier,
    pub rank: usize,
}

impl ModelCandidate {
    /// Order catalog identifiers: fast tier first, catalog order preserved within a tier.
    ///
    /// Strips the `models/` resource prefix and drops duplicates.
    pub fn rank_catalog<I, S>(ids: I) -> Vec<ModelCandidate>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = std::collections::HashSet::new();
        let mut fast = Vec::new();
        let mut other = Vec::new();

        for id in ids {
            let id = id.as_ref().trim();
            let id = id.strip_prefix("models/").unwrap_or(id);
            if id.is_empty() || !seen.insert(id.to_string()) {
                continue;
            }
            match ModelTier::classify(id) {
                ModelTier::Fast => fast.push(id.to_string()),
                ModelTier::Other => other.push(id.to_string()),
            }
        }

        fast.into_iter()
            .chain(other)
            .enumerate()
            .map(|(rank, id)| ModelCandidate {
                tier: ModelTier::classify(&id),
                id,
                rank,
            })
            .collect()
    }

    /// The static fallback list, ranked the same way as a live catalog.
    pub fn fallback() -> Vec<ModelCandidate> {
        Self::rank_catalog(FALLBACK_MODELS.iter().copied())
    }
}
