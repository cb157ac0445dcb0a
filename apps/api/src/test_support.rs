//! Shared fixtures and fakes for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::Router;
use serde_json::Value;

use crate::auth::oauth_state::OAuthStateStore;
use crate::config::Config;
use crate::llm_client::{CompletionOptions, LlmChatApi, LlmError};
use crate::models::profile::RawProfile;
use crate::ranking::repository::MemoryCandidateRepository;
use crate::ranking::store::{RankingPolicy, RankingStore};
use crate::scoring::batch::BatchScheduler;
use crate::scoring::fit_scorer::{fallback, FitScorer};
use crate::scoring::models::{DegradedReason, ScoredCandidate, SearchContext};
use crate::scout::pipeline::{PipelineSettings, ScoutPipeline};
use crate::sourcing::filter::CandidateFilter;
use crate::sourcing::query::QueryTerms;
use crate::sourcing::{ProfileSearchApi, ProfileSource, SourceError};
use crate::state::AppState;

/// A profile that passes the default relevance filter.
pub fn profile(external_id: &str, handle: &str) -> RawProfile {
    RawProfile {
        external_id: external_id.to_string(),
        handle: handle.to_string(),
        display_name: format!("{handle} display"),
        bio: "Senior backend engineer building Python services".to_string(),
        follower_count: 500,
        following_count: 120,
        avatar_url: format!("https://pbs.example.com/{handle}.jpg"),
        banner_url: None,
        recent_activity_text: "Shipped a new FastAPI release today".to_string(),
    }
}

pub fn context() -> SearchContext {
    SearchContext {
        role_title: "Backend Engineer".to_string(),
        keywords: vec!["Python".to_string(), "FastAPI".to_string()],
    }
}

pub fn scored(handle: &str, fit_score: u8) -> ScoredCandidate {
    ScoredCandidate {
        profile: profile(handle, handle),
        fit_score,
        rationale: format!("{handle} scored {fit_score}"),
        search_context: context(),
        degraded: None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Profile search
// ────────────────────────────────────────────────────────────────────────────

pub struct StaticSearchApi {
    result: Result<Vec<RawProfile>, u16>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearchApi {
    pub fn returning(profiles: Vec<RawProfile>) -> Self {
        Self {
            result: Ok(profiles),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            result: Err(status),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileSearchApi for StaticSearchApi {
    async fn search(&self, query: &str, _max_results: u32) -> Result<Vec<RawProfile>, SourceError> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.result {
            Ok(profiles) => Ok(profiles.clone()),
            Err(status) => Err(SourceError::Status {
                status: *status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LLM
// ────────────────────────────────────────────────────────────────────────────

pub struct ScriptedLlm {
    reply: Result<String, u16>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_with_status(status: u16) -> Self {
        Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmChatApi for ScriptedLlm {
    async fn complete(
        &self,
        prompt: &str,
        _system: &str,
        _options: CompletionOptions,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(LlmError::Api {
                status: *status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fit scorer
// ────────────────────────────────────────────────────────────────────────────

/// Scores from a per-handle table (default 60), tracking concurrency.
#[derive(Default)]
pub struct RecordingScorer {
    latency: Duration,
    degrade_every: usize,
    scores: HashMap<String, u8>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingScorer {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Every `n`th call returns the fallback instead of a real score.
    pub fn degrading_every(n: usize) -> Self {
        Self {
            degrade_every: n,
            ..Self::default()
        }
    }

    pub fn scoring(mut self, handle: &str, score: u8) -> Self {
        self.scores.insert(handle.to_string(), score);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FitScorer for RecordingScorer {
    async fn score(&self, context: &SearchContext, profile: &RawProfile) -> ScoredCandidate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.degrade_every > 0 && call % self.degrade_every == 0 {
            return fallback(context, profile, DegradedReason::Transport, "scripted");
        }

        let fit_score = self.scores.get(&profile.handle).copied().unwrap_or(60);
        ScoredCandidate {
            profile: profile.clone(),
            fit_score,
            rationale: format!("{} fits", profile.handle),
            search_context: context.clone(),
            degraded: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local HTTP backend
// ────────────────────────────────────────────────────────────────────────────

/// One request as seen by [`StubServer`].
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Value,
}

struct StubScript {
    responses: Mutex<VecDeque<(u16, Value)>>,
    requests: Mutex<Vec<StubRequest>>,
}

/// A loopback HTTP server answering from a script, in order. The last
/// response repeats once the script runs out.
pub struct StubServer {
    pub base_url: String,
    script: Arc<StubScript>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, Value)>) -> Self {
        let script = Arc::new(StubScript {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(answer).with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            script,
        }
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.script.requests.lock().unwrap().clone()
    }
}

async fn answer(
    State(script): State<Arc<StubScript>>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    script.requests.lock().unwrap().push(StubRequest {
        path: uri.path().to_string(),
        query,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let (status, payload) = {
        let mut responses = script.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap_or((404, Value::Null))
        }
    };
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        payload.to_string(),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Application state
// ────────────────────────────────────────────────────────────────────────────

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/talentscout_test".to_string()),
        "XAI_API_KEY" => Some("xai-test".to_string()),
        "TWITTER_CLIENT_ID" => Some("client-1".to_string()),
        "SCOUT_BATCH_DELAY_MS" => Some("0".to_string()),
        _ => None,
    })
    .unwrap()
}

/// Full state over the in-memory repository, a static search backend, and
/// the given scorer.
pub fn test_state(
    api: StaticSearchApi,
    scorer: RecordingScorer,
) -> (AppState, Arc<MemoryCandidateRepository>) {
    let config = test_config();
    let repo = Arc::new(MemoryCandidateRepository::new());
    let ranking = Arc::new(RankingStore::new(repo.clone(), RankingPolicy::default()));
    let pipeline = ScoutPipeline::new(
        ProfileSource::new(Arc::new(api), QueryTerms::default()),
        CandidateFilter::new(config.scout.filter.clone()),
        BatchScheduler::new(Arc::new(scorer), config.scout.batch_size, config.scout.batch_delay),
        ranking.clone(),
        repo.clone(),
        PipelineSettings::default(),
    );

    let state = AppState {
        config,
        pipeline: Arc::new(pipeline),
        ranking,
        candidates: repo.clone(),
        oauth_states: Arc::new(OAuthStateStore::default()),
    };
    (state, repo)
}
