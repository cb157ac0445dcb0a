//! Fit Scoring: trait-based scorer that rates one candidate profile against
//! a role.
//!
//! Default: `LlmFitScorer`, one chat completion per candidate. Scoring never
//! fails from the caller's point of view: every failure becomes the neutral
//! fallback score with a rationale naming the failure class.
//!
//! The pipeline holds an `Arc<dyn FitScorer>`, so tests swap in fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, CompletionOptions, LlmChatApi, LlmError};
use crate::models::profile::RawProfile;
use crate::scoring::models::{DegradedReason, ScoredCandidate, SearchContext, FALLBACK_SCORE};
use crate::scoring::prompts::FIT_SCORE_PROMPT_TEMPLATE;

const BIO_PROMPT_CHARS: usize = 600;
const ACTIVITY_PROMPT_CHARS: usize = 300;
const MISSING_REASONING: &str = "No reasoning provided";

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Scores one profile. Implementations must absorb their own failures.
#[async_trait]
pub trait FitScorer: Send + Sync {
    async fn score(&self, context: &SearchContext, profile: &RawProfile) -> ScoredCandidate;
}

// ────────────────────────────────────────────────────────────────────────────
// Typed verdict parsing
// ────────────────────────────────────────────────────────────────────────────

/// A validated model verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct FitVerdict {
    pub score: u8,
    pub reasoning: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum VerdictError {
    #[error("response is not a JSON object: {0}")]
    Unparseable(String),

    #[error("response has no numeric score")]
    MissingScore,
}

impl VerdictError {
    fn reason(&self) -> DegradedReason {
        match self {
            VerdictError::Unparseable(_) => DegradedReason::Unparseable,
            VerdictError::MissingScore => DegradedReason::MissingScore,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerdictWire {
    #[serde(default)]
    score: serde_json::Value,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parses and validates the model's reply. Integer strings such as `"85"` are
/// accepted, fractional scores truncated toward zero, and out-of-range scores
/// clamped into 0–100.
pub fn parse_verdict(text: &str) -> Result<FitVerdict, VerdictError> {
    let body = strip_json_fences(text);
    let wire: VerdictWire =
        serde_json::from_str(body).map_err(|e| VerdictError::Unparseable(e.to_string()))?;

    let value = match &wire.score {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or(VerdictError::MissingScore)?;
    let score = value.clamp(0, 100) as u8;

    let reasoning = wire
        .reasoning
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| MISSING_REASONING.to_string());

    Ok(FitVerdict { score, reasoning })
}

// ────────────────────────────────────────────────────────────────────────────
// LlmFitScorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 200,
        }
    }
}

pub struct LlmFitScorer {
    llm: Arc<dyn LlmChatApi>,
    settings: ScoringSettings,
}

impl LlmFitScorer {
    pub fn new(llm: Arc<dyn LlmChatApi>, settings: ScoringSettings) -> Self {
        Self { llm, settings }
    }
}

#[async_trait]
impl FitScorer for LlmFitScorer {
    async fn score(&self, context: &SearchContext, profile: &RawProfile) -> ScoredCandidate {
        let prompt = build_fit_prompt(context, profile);
        let options = CompletionOptions {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            json_mode: true,
        };

        let reply = match self.llm.complete(&prompt, JSON_ONLY_SYSTEM, options).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Scoring @{} degraded: {e}", profile.handle);
                return fallback(context, profile, llm_error_reason(&e), &e.to_string());
            }
        };

        match parse_verdict(&reply) {
            Ok(verdict) => ScoredCandidate {
                profile: profile.clone(),
                fit_score: verdict.score,
                rationale: verdict.reasoning,
                search_context: context.clone(),
                degraded: None,
            },
            Err(e) => {
                warn!("Scoring @{} degraded: {e}", profile.handle);
                fallback(context, profile, e.reason(), &e.to_string())
            }
        }
    }
}

fn llm_error_reason(error: &LlmError) -> DegradedReason {
    match error {
        // reqwest also reports undecodable response bodies here
        LlmError::Http(_) => DegradedReason::Transport,
        LlmError::Api { .. } | LlmError::RateLimited { .. } => DegradedReason::UpstreamStatus,
        LlmError::EmptyContent => DegradedReason::EmptyResponse,
    }
}

/// Builds the neutral-score candidate used whenever scoring fails.
pub fn fallback(
    context: &SearchContext,
    profile: &RawProfile,
    reason: DegradedReason,
    detail: &str,
) -> ScoredCandidate {
    ScoredCandidate {
        profile: profile.clone(),
        fit_score: FALLBACK_SCORE,
        rationale: format!("Scoring degraded ({reason}): {detail}"),
        search_context: context.clone(),
        degraded: Some(reason),
    }
}

fn build_fit_prompt(context: &SearchContext, profile: &RawProfile) -> String {
    let bio = non_blank(&profile.bio, "No bio");
    let activity = non_blank(&profile.recent_activity_text, "No recent activity");
    let keywords = context.keywords.join(", ");
    let bio = truncate_chars(bio, BIO_PROMPT_CHARS);
    let followers = profile.follower_count.to_string();
    let activity = truncate_chars(activity, ACTIVITY_PROMPT_CHARS);
    fill_template(
        FIT_SCORE_PROMPT_TEMPLATE,
        &[
            ("role_title", context.role_title.as_str()),
            ("keywords", keywords.as_str()),
            ("display_name", profile.display_name.as_str()),
            ("bio", bio.as_str()),
            ("followers", followers.as_str()),
            ("recent_activity", activity.as_str()),
        ],
    )
}

/// Substitutes `{name}` placeholders in a single pass over the template.
/// Inserted values are never rescanned; unknown braces are copied as-is.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = tail.find('}').and_then(|end| {
            let key = &tail[1..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (end, *value))
        });
        match hit {
            Some((end, value)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn non_blank<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
