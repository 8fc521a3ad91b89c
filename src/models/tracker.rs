use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of media a tracker item refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerType {
    Book,
    Movie,
    Music,
}

impl TrackerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerType::Book => "BOOK",
            TrackerType::Movie => "MOVIE",
            TrackerType::Music => "MUSIC",
        }
    }
}

impl FromStr for TrackerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BOOK" => Ok(TrackerType::Book),
            "MOVIE" => Ok(TrackerType::Movie),
            "MUSIC" => Ok(TrackerType::Music),
            other => Err(format!("unknown tracker type: {}", other)),
        }
    }
}

impl fmt::Display for TrackerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerStatus {
    Planned,
    InProgress,
    Completed,
}

impl TrackerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerStatus::Planned => "PLANNED",
            TrackerStatus::InProgress => "IN_PROGRESS",
            TrackerStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for TrackerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PLANNED" => Ok(TrackerStatus::Planned),
            "IN_PROGRESS" => Ok(TrackerStatus::InProgress),
            "COMPLETED" => Ok(TrackerStatus::Completed),
            other => Err(format!("unknown tracker status: {}", other)),
        }
    }
}

/// Where a tracker item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerSource {
    Manual,
    Import,
    NoteAuto,
}

impl TrackerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerSource::Manual => "MANUAL",
            TrackerSource::Import => "IMPORT",
            TrackerSource::NoteAuto => "NOTE_AUTO",
        }
    }
}

impl FromStr for TrackerSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MANUAL" => Ok(TrackerSource::Manual),
            "IMPORT" => Ok(TrackerSource::Import),
            "NOTE_AUTO" => Ok(TrackerSource::NoteAuto),
            other => Err(format!("unknown tracker source: {}", other)),
        }
    }
}

/// A book, movie or album in a user's library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackerItem {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: TrackerType,
    pub status: TrackerStatus,
    pub title: String,
    pub title_normalized: String,
    pub creator: Option<String>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub source: TrackerSource,
    pub is_recommendation: bool,
    pub source_note_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackerItem {
    /// Materialize a new item with a fresh id and timestamps.
    pub fn from_new(new: NewTrackerItem) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            item_type: new.item_type,
            status: new.status,
            title: new.title,
            title_normalized: new.title_normalized,
            creator: new.creator,
            rating: new.rating,
            notes: new.notes,
            tags: new.tags,
            source: new.source,
            is_recommendation: new.is_recommendation,
            source_note_id: new.source_note_id,
            started_at: new.started_at,
            finished_at: new.finished_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the item falls in the given calendar year: by finish date, or by
    /// creation date for items that were never finished.
    pub fn in_year(&self, year: i32) -> bool {
        match self.finished_at {
            Some(finished_at) => finished_at.year() == year,
            None => self.created_at.year() == year,
        }
    }
}

/// Insert payload for a tracker item; `title_normalized` must already be computed.
#[derive(Debug, Clone)]
pub struct NewTrackerItem {
    pub user_id: Uuid,
    pub item_type: TrackerType,
    pub status: TrackerStatus,
    pub title: String,
    pub title_normalized: String,
    pub creator: Option<String>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub source: TrackerSource,
    pub is_recommendation: bool,
    pub source_note_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Library listing filters. `None` means "don't filter on this field".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerFilter {
    pub item_type: Option<TrackerType>,
    pub status: Option<TrackerStatus>,
    pub is_recommendation: Option<bool>,
    pub year: Option<i32>,
}

impl TrackerFilter {
    pub fn matches(&self, item: &TrackerItem) -> bool {
        self.item_type.map_or(true, |t| item.item_type == t)
            && self.status.map_or(true, |s| item.status == s)
            && self
                .is_recommendation
                .map_or(true, |r| item.is_recommendation == r)
            && self.year.map_or(true, |y| item.in_year(y))
    }
}
