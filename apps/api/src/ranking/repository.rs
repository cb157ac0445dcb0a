//! Persistence boundary for candidate records and search sessions.
//!
//! Candidate writes are optimistic: `upsert` inserts when `version == 0` and
//! otherwise updates only if the stored version still matches, returning
//! [`RepositoryError::Conflict`] when another writer got there first.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::candidate::{CandidateRecord, SearchSessionRow};
use crate::scoring::models::ScoredCandidate;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("concurrent write conflict on candidate '{0}'")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Parameters for opening a new search session.
#[derive(Debug, Clone)]
pub struct NewSearchSession<'a> {
    pub role_title: &'a str,
    pub keywords: &'a [String],
    pub location_filter: Option<&'a str>,
}

#[async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<CandidateRecord>, RepositoryError>;

    /// Writes a merged record and returns the stored row (with bumped version).
    async fn upsert(&self, record: &CandidateRecord) -> Result<CandidateRecord, RepositoryError>;

    /// Sets the operator-managed stage, leaving scores and snapshot untouched.
    async fn set_pipeline_stage(
        &self,
        handle: &str,
        stage: Option<&str>,
    ) -> Result<Option<CandidateRecord>, RepositoryError>;

    /// Lists records by best score, highest first.
    async fn list(&self, limit: i64) -> Result<Vec<CandidateRecord>, RepositoryError>;

    async fn create_session(
        &self,
        session: NewSearchSession<'_>,
    ) -> Result<SearchSessionRow, RepositoryError>;

    async fn record_results(
        &self,
        session_id: Uuid,
        results: &[ScoredCandidate],
    ) -> Result<(), RepositoryError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgCandidateRepository {
    pool: PgPool,
}

impl PgCandidateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<CandidateRecord>, RepositoryError> {
        Ok(
            sqlx::query_as::<_, CandidateRecord>("SELECT * FROM candidates WHERE handle = $1")
                .bind(handle)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn upsert(&self, record: &CandidateRecord) -> Result<CandidateRecord, RepositoryError> {
        let stored = if record.version == 0 {
            // A concurrent first sighting wins the unique key; DO NOTHING lets us detect it.
            sqlx::query_as::<_, CandidateRecord>(
                r#"
                INSERT INTO candidates
                    (id, handle, display_name, bio, follower_count, following_count,
                     avatar_url, banner_url, recent_activity, best_score, best_rationale,
                     best_role_title, pipeline_stage, version, first_seen_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 1, now(), now())
                ON CONFLICT (handle) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(record.id)
            .bind(&record.handle)
            .bind(&record.display_name)
            .bind(&record.bio)
            .bind(record.follower_count)
            .bind(record.following_count)
            .bind(&record.avatar_url)
            .bind(&record.banner_url)
            .bind(&record.recent_activity)
            .bind(record.best_score)
            .bind(&record.best_rationale)
            .bind(&record.best_role_title)
            .bind(&record.pipeline_stage)
            .fetch_optional(&self.pool)
            .await?
        } else {
            // pipeline_stage is deliberately absent from the SET list.
            sqlx::query_as::<_, CandidateRecord>(
                r#"
                UPDATE candidates SET
                    display_name = $2, bio = $3, follower_count = $4, following_count = $5,
                    avatar_url = $6, banner_url = $7, recent_activity = $8,
                    best_score = $9, best_rationale = $10, best_role_title = $11,
                    version = version + 1, updated_at = now()
                WHERE handle = $1 AND version = $12
                RETURNING *
                "#,
            )
            .bind(&record.handle)
            .bind(&record.display_name)
            .bind(&record.bio)
            .bind(record.follower_count)
            .bind(record.following_count)
            .bind(&record.avatar_url)
            .bind(&record.banner_url)
            .bind(&record.recent_activity)
            .bind(record.best_score)
            .bind(&record.best_rationale)
            .bind(&record.best_role_title)
            .bind(record.version)
            .fetch_optional(&self.pool)
            .await?
        };

        stored.ok_or_else(|| RepositoryError::Conflict(record.handle.clone()))
    }

    async fn set_pipeline_stage(
        &self,
        handle: &str,
        stage: Option<&str>,
    ) -> Result<Option<CandidateRecord>, RepositoryError> {
        Ok(sqlx::query_as::<_, CandidateRecord>(
            r#"
            UPDATE candidates
            SET pipeline_stage = $2, version = version + 1, updated_at = now()
            WHERE handle = $1
            RETURNING *
            "#,
        )
        .bind(handle)
        .bind(stage)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list(&self, limit: i64) -> Result<Vec<CandidateRecord>, RepositoryError> {
        Ok(sqlx::query_as::<_, CandidateRecord>(
            "SELECT * FROM candidates ORDER BY best_score DESC, first_seen_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_session(
        &self,
        session: NewSearchSession<'_>,
    ) -> Result<SearchSessionRow, RepositoryError> {
        let row = sqlx::query_as::<_, SearchSessionRow>(
            r#"
            INSERT INTO search_sessions (id, role_title, keywords, location_filter)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session.role_title)
        .bind(session.keywords)
        .bind(session.location_filter)
        .fetch_one(&self.pool)
        .await?;

        info!("Opened search session {} for '{}'", row.id, row.role_title);
        Ok(row)
    }

    async fn record_results(
        &self,
        session_id: Uuid,
        results: &[ScoredCandidate],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for result in results {
            sqlx::query(
                r#"
                INSERT INTO search_results (id, session_id, handle, fit_score, rationale, degraded)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(crate::models::profile::normalize_handle(&result.profile.handle))
            .bind(i32::from(result.fit_score))
            .bind(&result.rationale)
            .bind(result.is_degraded())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory (tests)
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub use memory::MemoryCandidateRepository;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::models::profile::normalize_handle;

    /// Same optimistic semantics as the Postgres repository, plus a knob to
    /// inject conflicts.
    #[derive(Default)]
    pub struct MemoryCandidateRepository {
        records: Mutex<HashMap<String, CandidateRecord>>,
        sessions: Mutex<Vec<SearchSessionRow>>,
        results: Mutex<Vec<(Uuid, String, i32)>>,
        pending_conflicts: AtomicUsize,
        upserts: AtomicUsize,
    }

    impl MemoryCandidateRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// The next `n` upserts fail with a conflict after bumping the stored
        /// version, as if another writer had raced us.
        pub fn inject_conflicts(&self, n: usize) {
            self.pending_conflicts.store(n, Ordering::SeqCst);
        }

        pub fn upsert_calls(&self) -> usize {
            self.upserts.load(Ordering::SeqCst)
        }

        pub fn record(&self, handle: &str) -> Option<CandidateRecord> {
            self.records.lock().unwrap().get(handle).cloned()
        }

        pub fn sessions(&self) -> Vec<SearchSessionRow> {
            self.sessions.lock().unwrap().clone()
        }

        pub fn results_for(&self, session_id: Uuid) -> Vec<(String, i32)> {
            self.results
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _, _)| *id == session_id)
                .map(|(_, handle, score)| (handle.clone(), *score))
                .collect()
        }
    }

    #[async_trait]
    impl CandidateRepository for MemoryCandidateRepository {
        async fn find_by_handle(
            &self,
            handle: &str,
        ) -> Result<Option<CandidateRecord>, RepositoryError> {
            Ok(self.record(handle))
        }

        async fn upsert(&self, record: &CandidateRecord) -> Result<CandidateRecord, RepositoryError> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            let mut records = self.records.lock().unwrap();

            if self
                .pending_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                if let Some(existing) = records.get_mut(&record.handle) {
                    existing.version += 1;
                }
                return Err(RepositoryError::Conflict(record.handle.clone()));
            }

            let now = Utc::now();
            match records.get(&record.handle) {
                None if record.version == 0 => {
                    let stored = CandidateRecord {
                        version: 1,
                        first_seen_at: now,
                        updated_at: now,
                        ..record.clone()
                    };
                    records.insert(record.handle.clone(), stored.clone());
                    Ok(stored)
                }
                Some(existing) if existing.version == record.version => {
                    let stored = CandidateRecord {
                        id: existing.id,
                        pipeline_stage: existing.pipeline_stage.clone(),
                        first_seen_at: existing.first_seen_at,
                        version: existing.version + 1,
                        updated_at: now,
                        ..record.clone()
                    };
                    records.insert(record.handle.clone(), stored.clone());
                    Ok(stored)
                }
                _ => Err(RepositoryError::Conflict(record.handle.clone())),
            }
        }

        async fn set_pipeline_stage(
            &self,
            handle: &str,
            stage: Option<&str>,
        ) -> Result<Option<CandidateRecord>, RepositoryError> {
            let mut records = self.records.lock().unwrap();
            Ok(records.get_mut(handle).map(|r| {
                r.pipeline_stage = stage.map(str::to_string);
                r.version += 1;
                r.updated_at = Utc::now();
                r.clone()
            }))
        }

        async fn list(&self, limit: i64) -> Result<Vec<CandidateRecord>, RepositoryError> {
            let mut all: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
            all.sort_by(|a, b| {
                b.best_score
                    .cmp(&a.best_score)
                    .then(a.first_seen_at.cmp(&b.first_seen_at))
            });
            all.truncate(limit.max(0) as usize);
            Ok(all)
        }

        async fn create_session(
            &self,
            session: NewSearchSession<'_>,
        ) -> Result<SearchSessionRow, RepositoryError> {
            let row = SearchSessionRow {
                id: Uuid::new_v4(),
                role_title: session.role_title.to_string(),
                keywords: session.keywords.to_vec(),
                location_filter: session.location_filter.map(str::to_string),
                created_at: Utc::now(),
            };
            self.sessions.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn record_results(
            &self,
            session_id: Uuid,
            results: &[ScoredCandidate],
        ) -> Result<(), RepositoryError> {
            let mut stored = self.results.lock().unwrap();
            for result in results {
                stored.push((
                    session_id,
                    normalize_handle(&result.profile.handle),
                    i32::from(result.fit_score),
                ));
            }
            Ok(())
        }
    }
}
