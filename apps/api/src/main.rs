mod auth;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod ranking;
mod routes;
mod scoring;
mod scout;
mod sourcing;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::oauth_state::OAuthStateStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::ranking::repository::PgCandidateRepository;
use crate::ranking::store::{RankingPolicy, RankingStore, DEFAULT_MAX_WRITE_ATTEMPTS};
use crate::routes::build_router;
use crate::scoring::batch::BatchScheduler;
use crate::scoring::fit_scorer::{LlmFitScorer, ScoringSettings};
use crate::scout::pipeline::{PipelineSettings, ScoutPipeline};
use crate::sourcing::filter::CandidateFilter;
use crate::sourcing::query::QueryTerms;
use crate::sourcing::twitter::XSearchClient;
use crate::sourcing::ProfileSource;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TalentScout API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let candidates = Arc::new(PgCandidateRepository::new(db));

    // Initialize profile search
    if config.twitter_bearer_token.is_none() {
        warn!("TWITTER_BEARER_TOKEN is not set; every search will return no candidates");
    }
    let search_api = XSearchClient::new(
        config.twitter_base_url.clone(),
        config.twitter_bearer_token.clone(),
    )?;
    let source = ProfileSource::new(Arc::new(search_api), QueryTerms::default());

    // Initialize LLM client and fit scorer
    let llm = LlmClient::new(
        config.xai_api_key.clone(),
        config.xai_base_url.clone(),
        config.xai_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());
    let fit_scorer = Arc::new(LlmFitScorer::new(Arc::new(llm), ScoringSettings::default()));

    let scout = &config.scout;
    let scheduler = BatchScheduler::new(fit_scorer, scout.batch_size, scout.batch_delay);
    info!(
        "Scoring in batches of {} with {:?} between batches",
        scheduler.batch_size(),
        scout.batch_delay
    );

    let ranking = Arc::new(RankingStore::new(
        candidates.clone(),
        RankingPolicy {
            qualified_threshold: scout.qualified_threshold,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        },
    ));

    let pipeline = ScoutPipeline::new(
        source,
        CandidateFilter::new(scout.filter.clone()),
        scheduler,
        ranking.clone(),
        candidates.clone(),
        PipelineSettings {
            top_n: scout.top_n,
            max_candidates_per_search: scout.max_candidates,
        },
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline: Arc::new(pipeline),
        ranking,
        candidates,
        oauth_states: Arc::new(OAuthStateStore::default()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
