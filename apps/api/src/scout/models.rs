use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::scoring::models::SearchContext;

pub const DEFAULT_RESULT_LIMIT: u32 = 20;
pub const MIN_RESULT_LIMIT: u32 = 10;
pub const MAX_RESULT_LIMIT: u32 = 500;

/// Body of `POST /api/v1/scout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(alias = "job_title", default)]
    pub role_title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub location_filter: Option<String>,
    /// Clamped into 10–500 during validation.
    #[serde(default = "default_result_limit")]
    pub result_limit: i64,
}

fn default_result_limit() -> i64 {
    i64::from(DEFAULT_RESULT_LIMIT)
}

/// A request that passed validation, with every field normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSearch {
    pub context: SearchContext,
    pub location_filter: Option<String>,
    pub result_limit: u32,
}

impl SearchRequest {
    pub fn validate(self) -> Result<ValidatedSearch, AppError> {
        let role_title = self.role_title.trim().to_string();
        if role_title.is_empty() {
            return Err(AppError::Validation("role_title must not be blank".to_string()));
        }

        let keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keywords.is_empty() {
            return Err(AppError::Validation(
                "keywords must contain at least one non-blank entry".to_string(),
            ));
        }

        let location_filter = self
            .location_filter
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let result_limit = self
            .result_limit
            .clamp(i64::from(MIN_RESULT_LIMIT), i64::from(MAX_RESULT_LIMIT)) as u32;

        Ok(ValidatedSearch {
            context: SearchContext {
                role_title,
                keywords,
            },
            location_filter,
            result_limit,
        })
    }
}
