use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::profile::RawProfile;

/// Fit score assigned when scoring could not produce a usable verdict.
pub const FALLBACK_SCORE: u8 = 50;

/// The role and keywords a candidate was scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    pub role_title: String,
    pub keywords: Vec<String>,
}

/// Why a score came from the fallback path instead of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    Transport,
    UpstreamStatus,
    EmptyResponse,
    Unparseable,
    MissingScore,
}

impl DegradedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedReason::Transport => "transport",
            DegradedReason::UpstreamStatus => "upstream_status",
            DegradedReason::EmptyResponse => "empty_response",
            DegradedReason::Unparseable => "unparseable",
            DegradedReason::MissingScore => "missing_score",
        }
    }
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A profile with its fit score for one search. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub profile: RawProfile,
    pub fit_score: u8, // 0 – 100
    pub rationale: String,
    pub search_context: SearchContext,
    /// Set only when the score is the fallback.
    pub degraded: Option<DegradedReason>,
}

impl ScoredCandidate {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}
