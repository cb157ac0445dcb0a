use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::profile::normalize_handle;
use crate::scoring::models::ScoredCandidate;

pub const AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/100";
const NO_BIO: &str = "No bio available";
const NO_RECENT_POST: &str = "No recent posts";
const DEFAULT_TAG: &str = "Developer";
const MAX_TAGS: usize = 4;

/// Skills surfaced as card tags, in display priority order.
const SKILL_TAGS: &[&str] = &[
    "python",
    "javascript",
    "react",
    "node",
    "aws",
    "docker",
    "kubernetes",
    "typescript",
    "go",
    "rust",
];

/// One ranked candidate as the UI renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCard {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub avatar: String,
    pub banner: Option<String>,
    pub bio: String,
    pub followers: String,
    pub following: String,
    #[serde(rename = "match")]
    pub match_score: u8,
    pub reasoning: String,
    pub degraded: bool,
    pub tags: Vec<String>,
    pub recent_post: String,
    pub roles: Vec<String>,
}

impl From<&ScoredCandidate> for CandidateCard {
    fn from(candidate: &ScoredCandidate) -> Self {
        let profile = &candidate.profile;
        let handle = normalize_handle(&profile.handle);

        CandidateCard {
            name: or_default(&profile.display_name, &handle),
            handle: format!("@{handle}"),
            id: handle,
            avatar: or_default(&profile.avatar_url, AVATAR_PLACEHOLDER),
            banner: profile.banner_url.clone().filter(|b| !b.trim().is_empty()),
            bio: or_default(&profile.bio, NO_BIO),
            followers: format_count(profile.follower_count),
            following: format_count(profile.following_count),
            match_score: candidate.fit_score,
            reasoning: candidate.rationale.clone(),
            degraded: candidate.is_degraded(),
            tags: skill_tags(&profile.bio),
            recent_post: or_default(&profile.recent_activity_text, NO_RECENT_POST),
            roles: vec![candidate.search_context.role_title.clone()],
        }
    }
}

/// Compact display count: `1.2M`, `3.4K`, or the raw number below 1000.
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Up to four skills that appear as whole words in the bio.
pub fn skill_tags(bio: &str) -> Vec<String> {
    let lower = bio.to_lowercase();
    let words: HashSet<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let tags: Vec<String> = SKILL_TAGS
        .iter()
        .filter(|skill| words.contains(*skill))
        .take(MAX_TAGS)
        .map(|skill| skill.to_string())
        .collect();

    if tags.is_empty() {
        vec![DEFAULT_TAG.to_string()]
    } else {
        tags
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
