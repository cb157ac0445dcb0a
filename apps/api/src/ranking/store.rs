//! Ranking Store: merges scored candidates into their persisted records and
//! returns the top-N view of one search.
//!
//! Writes for one handle are serialized by an in-process async lock; the
//! repository's optimistic version check catches writers outside this
//! process, and a conflict is resolved by re-reading and re-merging.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::candidate::{CandidateRecord, PipelineStage};
use crate::models::profile::normalize_handle;
use crate::ranking::repository::{CandidateRepository, RepositoryError};
use crate::scoring::models::ScoredCandidate;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_QUALIFIED_THRESHOLD: u8 = 75;
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("gave up writing candidate '{handle}' after {attempts} conflicting attempts")]
    ConflictsExhausted { handle: String, attempts: u32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingPolicy {
    /// New records scoring at or above this start as `Qualified`.
    pub qualified_threshold: u8,
    pub max_write_attempts: u32,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            qualified_threshold: DEFAULT_QUALIFIED_THRESHOLD,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

pub struct RankingStore {
    repo: Arc<dyn CandidateRepository>,
    policy: RankingPolicy,
    locks: HandleLocks,
}

impl RankingStore {
    pub fn new(repo: Arc<dyn CandidateRepository>, policy: RankingPolicy) -> Self {
        Self {
            repo,
            policy,
            locks: HandleLocks::default(),
        }
    }

    /// Persists every candidate and returns the best `top_n`, highest score
    /// first. Ties keep their input order.
    pub async fn upsert_and_rank(
        &self,
        scored: Vec<ScoredCandidate>,
        top_n: usize,
    ) -> Result<Vec<ScoredCandidate>, RankingError> {
        let mut ranked = collapse_duplicates(scored);

        for candidate in &ranked {
            let handle = normalize_handle(&candidate.profile.handle);
            let _guard = self.locks.lock(&handle).await;
            self.write_with_retry(&handle, candidate).await?;
        }

        // sort_by is stable
        ranked.sort_by(|a, b| b.fit_score.cmp(&a.fit_score));
        ranked.truncate(top_n);

        info!("Ranked {} candidates (top {top_n})", ranked.len());
        Ok(ranked)
    }

    /// Operator edit of a candidate's pipeline stage. `None` clears it.
    /// Returns `None` when no record exists for the handle.
    pub async fn set_stage(
        &self,
        handle: &str,
        stage: Option<PipelineStage>,
    ) -> Result<Option<CandidateRecord>, RankingError> {
        let handle = normalize_handle(handle);
        let _guard = self.locks.lock(&handle).await;
        let updated = self
            .repo
            .set_pipeline_stage(&handle, stage.as_ref().map(PipelineStage::as_str))
            .await?;

        if updated.is_some() {
            info!(
                "Pipeline stage of @{handle} set to {}",
                stage.map_or("none", |s| s.as_str())
            );
        }
        Ok(updated)
    }

    async fn write_with_retry(
        &self,
        handle: &str,
        candidate: &ScoredCandidate,
    ) -> Result<CandidateRecord, RankingError> {
        let attempts = self.policy.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let existing = self.repo.find_by_handle(handle).await?;
            let merged = merge_record(existing, candidate, self.policy.qualified_threshold);

            match self.repo.upsert(&merged).await {
                Ok(stored) => {
                    debug!("Stored @{handle} (best {}, v{})", stored.best_score, stored.version);
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!("Write conflict on @{handle}, attempt {attempt}/{attempts}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RankingError::ConflictsExhausted {
            handle: handle.to_string(),
            attempts,
        })
    }
}

/// Keeps one entry per handle at its first position, carrying the higher
/// score of the duplicates.
fn collapse_duplicates(scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<ScoredCandidate> = Vec::with_capacity(scored.len());

    for candidate in scored {
        match positions.entry(normalize_handle(&candidate.profile.handle)) {
            Entry::Occupied(slot) => {
                let kept = &mut unique[*slot.get()];
                if candidate.fit_score > kept.fit_score {
                    *kept = candidate;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(unique.len());
                unique.push(candidate);
            }
        }
    }
    unique
}

/// Merges a scored candidate into the stored record for its handle.
///
/// The profile snapshot always takes the new values. `best_*` moves only on a
/// strictly higher score, and an existing pipeline stage is never touched.
pub fn merge_record(
    existing: Option<CandidateRecord>,
    candidate: &ScoredCandidate,
    qualified_threshold: u8,
) -> CandidateRecord {
    let profile = &candidate.profile;
    let score = i32::from(candidate.fit_score);
    let now = Utc::now();

    let base = existing.unwrap_or_else(|| {
        let stage = if candidate.fit_score >= qualified_threshold {
            PipelineStage::Qualified
        } else {
            PipelineStage::Discovered
        };
        CandidateRecord {
            id: Uuid::new_v4(),
            handle: normalize_handle(&profile.handle),
            display_name: String::new(),
            bio: String::new(),
            follower_count: 0,
            following_count: 0,
            avatar_url: String::new(),
            banner_url: None,
            recent_activity: String::new(),
            best_score: -1,
            best_rationale: String::new(),
            best_role_title: String::new(),
            pipeline_stage: Some(stage.as_str().to_string()),
            version: 0,
            first_seen_at: now,
            updated_at: now,
        }
    });

    let improves = score > base.best_score;
    CandidateRecord {
        display_name: profile.display_name.clone(),
        bio: profile.bio.clone(),
        follower_count: clamp_count(profile.follower_count),
        following_count: clamp_count(profile.following_count),
        avatar_url: profile.avatar_url.clone(),
        banner_url: profile.banner_url.clone(),
        recent_activity: profile.recent_activity_text.clone(),
        best_score: if improves { score } else { base.best_score },
        best_rationale: if improves {
            candidate.rationale.clone()
        } else {
            base.best_rationale.clone()
        },
        best_role_title: if improves {
            candidate.search_context.role_title.clone()
        } else {
            base.best_role_title.clone()
        },
        updated_at: now,
        ..base
    }
}

fn clamp_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

// ────────────────────────────────────────────────────────────────────────────
// Per-handle locks
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct HandleLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl HandleLocks {
    async fn lock(&self, handle: &str) -> HandleGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(handle.to_string()).or_default().clone()
        };
        HandleGuard {
            guard: Some(lock.lock_owned().await),
            handle: handle.to_string(),
            locks: self.inner.clone(),
        }
    }
}

/// Releases the handle lock on drop and forgets the entry once nobody else
/// holds or waits on it.
struct HandleGuard {
    guard: Option<OwnedMutexGuard<()>>,
    handle: String,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = map.get(&self.handle) {
            if Arc::strong_count(lock) == 1 {
                map.remove(&self.handle);
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
