use crate::models::TrackerType;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which pattern family produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateReason {
    QuotedIntent,
    Intent,
}

/// A media mention found in free text, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationCandidate {
    #[serde(rename = "type")]
    pub item_type: TrackerType,
    #[schema(example = "Project Hail Mary")]
    pub title: String,
    pub reason: CandidateReason,
}
