use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Operator-managed recruiting funnel label. Stored as its display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Discovered,
    Qualified,
    Screening,
    #[serde(rename = "Round 1")]
    Round1,
    #[serde(rename = "Round 2")]
    Round2,
    Final,
    Offer,
    Rejected,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 8] = [
        PipelineStage::Discovered,
        PipelineStage::Qualified,
        PipelineStage::Screening,
        PipelineStage::Round1,
        PipelineStage::Round2,
        PipelineStage::Final,
        PipelineStage::Offer,
        PipelineStage::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Discovered => "Discovered",
            PipelineStage::Qualified => "Qualified",
            PipelineStage::Screening => "Screening",
            PipelineStage::Round1 => "Round 1",
            PipelineStage::Round2 => "Round 2",
            PipelineStage::Final => "Final",
            PipelineStage::Offer => "Offer",
            PipelineStage::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown pipeline stage '{s}'"))
    }
}

/// Persisted candidate identity. One row per handle.
///
/// `version` is 0 for a record that has never been written; the repository
/// uses it as an optimistic-concurrency token on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub bio: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub avatar_url: String,
    pub banner_url: Option<String>,
    pub recent_activity: String,
    pub best_score: i32,
    pub best_rationale: String,
    pub best_role_title: String,
    pub pipeline_stage: Option<String>,
    pub version: i32,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SearchSessionRow {
    pub id: Uuid,
    pub role_title: String,
    pub keywords: Vec<String>,
    pub location_filter: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_round_trips_display_string() {
        for stage in PipelineStage::ALL {
            assert_eq!(stage.as_str().parse::<PipelineStage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_stage_parse_is_case_insensitive() {
        assert_eq!(
            "round 1".parse::<PipelineStage>().unwrap(),
            PipelineStage::Round1
        );
    }

    #[test]
    fn test_stage_parse_rejects_unknown() {
        assert!("Round 3".parse::<PipelineStage>().is_err());
    }

    #[test]
    fn test_stage_serializes_with_spaces() {
        let json = serde_json::to_string(&PipelineStage::Round2).unwrap();
        assert_eq!(json, "\"Round 2\"");
    }
}
