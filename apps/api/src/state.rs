use std::sync::Arc;

use crate::auth::oauth_state::OAuthStateStore;
use crate::config::Config;
use crate::ranking::repository::CandidateRepository;
use crate::ranking::store::RankingStore;
use crate::scout::pipeline::ScoutPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<ScoutPipeline>,
    /// Same store the pipeline writes through, so stage edits share its
    /// per-handle locks.
    pub ranking: Arc<RankingStore>,
    pub candidates: Arc<dyn CandidateRepository>,
    pub oauth_states: Arc<OAuthStateStore>,
}
