//! Candidate pre-filter: cheap predicates that keep low-signal accounts away
//! from the LLM scoring step.

use serde::{Deserialize, Serialize};

use crate::models::profile::RawProfile;

pub const DEFAULT_ROLE_INDICATORS: &[&str] = &[
    "developer",
    "engineer",
    "programmer",
    "software",
    "frontend",
    "backend",
    "full-stack",
    "devops",
    "sre",
    "architect",
    "tech lead",
    "cto",
    "ceo",
];

pub const DEFAULT_TECH_KEYWORDS: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "rust",
    "golang",
    "c++",
    "kotlin",
    "swift",
    "ruby",
    "php",
    "scala",
    "elixir",
    "react",
    "vue",
    "angular",
    "svelte",
    "node",
    "django",
    "fastapi",
    "flask",
    "rails",
    "spring",
    "kubernetes",
    "docker",
    "terraform",
    "aws",
    "gcp",
    "azure",
    "postgres",
    "sql",
    "graphql",
    "tensorflow",
    "pytorch",
    "machine learning",
    "llm",
];

/// Tunable thresholds and allow-lists for [`CandidateFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Bios shorter than this are rejected before any other check.
    pub hard_min_bio_chars: usize,
    pub min_bio_chars: usize,
    pub min_followers: u64,
    pub role_indicators: Vec<String>,
    pub tech_keywords: Vec<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            hard_min_bio_chars: 10,
            min_bio_chars: 20,
            min_followers: 50,
            role_indicators: DEFAULT_ROLE_INDICATORS.iter().map(|s| s.to_string()).collect(),
            tech_keywords: DEFAULT_TECH_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result of partitioning profiles into kept and removed, order preserved.
#[derive(Debug, Default)]
pub struct FilterResult {
    pub kept: Vec<RawProfile>,
    pub removed: Vec<RawProfile>,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    policy: FilterPolicy,
}

impl CandidateFilter {
    pub fn new(policy: FilterPolicy) -> Self {
        Self { policy }
    }

    /// A profile qualifies when its bio is long enough, mentions a role or a
    /// technology, and the account has enough followers.
    pub fn is_qualified(&self, profile: &RawProfile) -> bool {
        if profile.follower_count < self.policy.min_followers {
            return false;
        }

        let bio = profile.bio.trim();
        let bio_chars = bio.chars().count();
        if bio.is_empty() || bio_chars < self.policy.hard_min_bio_chars {
            return false;
        }
        if bio_chars < self.policy.min_bio_chars {
            return false;
        }

        let bio_lower = bio.to_lowercase();
        contains_any(&bio_lower, &self.policy.role_indicators)
            || contains_any(&bio_lower, &self.policy.tech_keywords)
    }

    pub fn partition(&self, profiles: Vec<RawProfile>) -> FilterResult {
        let (kept, removed) = profiles.into_iter().partition(|p| self.is_qualified(p));
        FilterResult { kept, removed }
    }
}

fn contains_any(haystack_lower: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .filter(|n| !n.is_empty())
        .any(|n| haystack_lower.contains(&n.to_lowercase()))
}
