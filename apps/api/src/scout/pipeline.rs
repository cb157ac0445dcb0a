//! Scout pipeline: one search end to end:
//! validate → fetch → filter → cap → session → batch-score → rank → record.
//!
//! Routine absence (no profiles, source down, nothing qualifies) yields an
//! empty list. Only invalid input and storage failures are errors.

use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::ranking::repository::{CandidateRepository, NewSearchSession};
use crate::ranking::store::{RankingStore, DEFAULT_TOP_N};
use crate::scoring::batch::BatchScheduler;
use crate::scoring::models::ScoredCandidate;
use crate::scout::models::SearchRequest;
use crate::sourcing::filter::CandidateFilter;
use crate::sourcing::{FetchOutcome, ProfileSource};

pub const DEFAULT_MAX_CANDIDATES_PER_SEARCH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub top_n: usize,
    pub max_candidates_per_search: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            max_candidates_per_search: DEFAULT_MAX_CANDIDATES_PER_SEARCH,
        }
    }
}

pub struct ScoutPipeline {
    source: ProfileSource,
    filter: CandidateFilter,
    scheduler: BatchScheduler,
    ranking: Arc<RankingStore>,
    repo: Arc<dyn CandidateRepository>,
    settings: PipelineSettings,
}

impl ScoutPipeline {
    pub fn new(
        source: ProfileSource,
        filter: CandidateFilter,
        scheduler: BatchScheduler,
        ranking: Arc<RankingStore>,
        repo: Arc<dyn CandidateRepository>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            filter,
            scheduler,
            ranking,
            repo,
            settings,
        }
    }

    /// Runs one search and returns at most `top_n` candidates, highest fit first.
    pub async fn run_search(&self, request: SearchRequest) -> Result<Vec<ScoredCandidate>, AppError> {
        let search = request.validate()?;
        let context = search.context;
        info!(
            "Scouting '{}' with keywords {:?}",
            context.role_title, context.keywords
        );

        let outcome = self
            .source
            .fetch(
                &context.keywords,
                &context.role_title,
                search.location_filter.as_deref(),
                search.result_limit,
            )
            .await;
        let raw = match outcome {
            FetchOutcome::Found(profiles) => profiles,
            FetchOutcome::Empty => return Ok(Vec::new()),
            FetchOutcome::SourceUnavailable(reason) => {
                info!("Returning no candidates, profile source unavailable: {reason}");
                return Ok(Vec::new());
            }
        };

        let filtered = self.filter.partition(raw);
        info!(
            "{} profiles passed the relevance filter, {} removed",
            filtered.kept.len(),
            filtered.removed.len()
        );
        let mut kept = filtered.kept;
        if kept.is_empty() {
            return Ok(Vec::new());
        }
        kept.truncate(self.settings.max_candidates_per_search);

        let session = self
            .repo
            .create_session(NewSearchSession {
                role_title: &context.role_title,
                keywords: &context.keywords,
                location_filter: search.location_filter.as_deref(),
            })
            .await?;

        let scored = self.scheduler.score_all(&context, &kept).await;
        let ranked = self
            .ranking
            .upsert_and_rank(scored.clone(), self.settings.top_n)
            .await?;
        self.repo.record_results(session.id, &scored).await?;

        info!(
            "Search {} finished: {} scored, returning {}",
            session.id,
            scored.len(),
            ranked.len()
        );
        Ok(ranked)
    }
}
