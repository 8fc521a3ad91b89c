use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub use recommendation::{CandidateReason, RecommendationCandidate};
pub use tracker::{
    NewTrackerItem, TrackerFilter, TrackerItem, TrackerSource, TrackerStatus, TrackerType,
};

mod recommendation;
mod tracker;

lazy_static! {
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap();
}

/// Read the number a free-form rating starts with: `"4 stars"` is 4 and
/// `"4.5/5"` is 4.5. Returns `None` when there is no finite leading number.
pub(crate) fn parse_leading_number(raw: &str) -> Option<f64> {
    LEADING_NUMBER
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Numeric fields arrive either as JSON numbers or as strings from form inputs.
/// Anything that isn't a finite number is treated as absent.
fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        Float(f64),
        String(String),
        Other(serde_json::Value),
    }

    let value = match Option::<StringOrFloat>::deserialize(deserializer)? {
        Some(StringOrFloat::Float(f)) => Some(f),
        Some(StringOrFloat::String(s)) => parse_leading_number(&s),
        Some(StringOrFloat::Other(_)) | None => None,
    };

    Ok(value.filter(|v| v.is_finite()))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_lenient_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

/// Request body for candidate extraction and ingestion
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    /// Free text, typically a transcribed voice memo
    #[schema(example = "Should watch Dune tonight with Sarah, then read Sapiens.")]
    #[serde(default)]
    pub text: String,
    /// Note the text belongs to; recorded on ingested items
    #[serde(default)]
    pub source_note_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractResponse {
    pub candidates: Vec<RecommendationCandidate>,
}

/// Outcome of persisting recommendation candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestionSummary {
    pub created: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

/// Identifies the user a library request acts on
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserScope {
    pub user_id: Uuid,
}

/// Library listing query. Unrecognized filter values are ignored.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LibraryQuery {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub status: Option<String>,
    pub year: Option<String>,
    pub recommendations: Option<String>,
}

impl LibraryQuery {
    pub fn filter(&self) -> TrackerFilter {
        let year = self
            .year
            .as_deref()
            .filter(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|y| y.parse().ok());

        let is_recommendation = match self.recommendations.as_deref() {
            Some("1") | Some("true") => Some(true),
            Some("0") | Some("false") => Some(false),
            _ => None,
        };

        TrackerFilter {
            item_type: self.item_type.as_deref().and_then(|t| t.parse().ok()),
            status: self.status.as_deref().and_then(|s| s.parse().ok()),
            is_recommendation,
            year,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackerItemRequest {
    #[schema(example = "Project Hail Mary")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    #[schema(example = "BOOK")]
    pub item_type: Option<String>,
    pub status: Option<String>,
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_recommendation: bool,
    #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTrackerItemRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub status: Option<String>,
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_recommendation: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_datetime")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackerItemResponse {
    pub item: TrackerItem,
    /// Set when the item was already in the library
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub existing: bool,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImportQuery {
    pub user_id: Uuid,
    /// BOOK, MOVIE or MUSIC
    #[serde(rename = "type")]
    pub item_type: String,
    /// `completed` or `recommended`
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "2026-01-15T10:30:00Z")]
    pub timestamp: String,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Title is required")]
    pub error: String,
}
