//! Profile sourcing: query construction, the external search backend, and
//! the pre-filter that runs before scoring.

pub mod filter;
pub mod query;
pub mod twitter;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::profile::RawProfile;
use crate::sourcing::query::{build_query, QueryTerms};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("search source is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API returned status {status}: {message}")]
    Status { status: u16, message: String },
}

/// The external profile search endpoint.
#[async_trait]
pub trait ProfileSearchApi: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<RawProfile>, SourceError>;
}

/// Outcome of one fetch. Absence of data is a normal outcome, not an error.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(Vec<RawProfile>),
    Empty,
    SourceUnavailable(String),
}

#[derive(Clone)]
pub struct ProfileSource {
    api: Arc<dyn ProfileSearchApi>,
    terms: QueryTerms,
}

impl ProfileSource {
    pub fn new(api: Arc<dyn ProfileSearchApi>, terms: QueryTerms) -> Self {
        Self { api, terms }
    }

    pub async fn fetch(
        &self,
        keywords: &[String],
        role_title: &str,
        location_filter: Option<&str>,
        max_results: u32,
    ) -> FetchOutcome {
        let query = build_query(keywords, role_title, location_filter, &self.terms);
        info!("Searching profiles (max {max_results}): {query}");

        let profiles = match self.api.search(&query, max_results).await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Profile source unavailable: {e}");
                return FetchOutcome::SourceUnavailable(e.to_string());
            }
        };

        let profiles = dedup_by_external_id(profiles, max_results as usize);
        if profiles.is_empty() {
            info!("No profiles matched query");
            return FetchOutcome::Empty;
        }

        info!("Profile source returned {} unique profiles", profiles.len());
        FetchOutcome::Found(profiles)
    }
}

fn dedup_by_external_id(profiles: Vec<RawProfile>, limit: usize) -> Vec<RawProfile> {
    let mut seen = HashSet::new();
    profiles
        .into_iter()
        .filter(|p| seen.insert(p.external_id.clone()))
        .take(limit)
        .collect()
}
