use crate::{
    error::{ApiError, Result},
    models::{
        CreateTrackerItemRequest, NewTrackerItem, TrackerFilter, TrackerItem, TrackerSource,
        TrackerStatus, TrackerType, UpdateTrackerItemRequest,
    },
    services::{extractor::normalize_title, tracker_store::TrackerStore},
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const MAX_TITLE_LENGTH: usize = 500;

/// Result of a create call; `existing` is set when the title was already tracked.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub item: TrackerItem,
    pub existing: bool,
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// User-scoped CRUD over the tracker library
#[derive(Clone)]
pub struct LibraryService {
    store: Arc<dyn TrackerStore>,
}

impl LibraryService {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &Arc<dyn TrackerStore> {
        &self.store
    }

    pub async fn list(&self, user_id: Uuid, filter: &TrackerFilter) -> Result<Vec<TrackerItem>> {
        self.store.list(user_id, filter).await
    }

    /// Add an item to the library, or return the one already tracked under the
    /// same type and normalized title.
    ///
    /// Recommendations always start out planned; anything else is recorded as
    /// completed.
    pub async fn create(
        &self,
        user_id: Uuid,
        request: &CreateTrackerItemRequest,
    ) -> Result<CreateOutcome> {
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        if title.is_empty() {
            return Err(ApiError::InvalidInput("Title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ApiError::InvalidInput(format!(
                "Title exceeds maximum length ({} characters)",
                MAX_TITLE_LENGTH
            )));
        }

        let item_type: TrackerType = request
            .item_type
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|_| ApiError::InvalidInput("Invalid type".to_string()))?;

        let title_normalized = normalize_title(&title);
        if title_normalized.is_empty() {
            return Err(ApiError::InvalidInput("Invalid title".to_string()));
        }

        if let Some(item) = self
            .store
            .find_by_key(user_id, item_type, &title_normalized)
            .await?
        {
            debug!("'{}' is already in the library of user {}", title, user_id);
            return Ok(CreateOutcome {
                item,
                existing: true,
            });
        }

        let is_recommendation = request.is_recommendation;
        let status = if is_recommendation {
            TrackerStatus::Planned
        } else {
            TrackerStatus::Completed
        };

        let item = self
            .store
            .insert(NewTrackerItem {
                user_id,
                item_type,
                status,
                title,
                title_normalized,
                creator: non_empty(trimmed(request.creator.as_ref())),
                rating: request.rating,
                notes: trimmed(request.notes.as_ref()),
                tags: request.tags.clone().unwrap_or_default(),
                source: TrackerSource::Manual,
                is_recommendation,
                source_note_id: None,
                started_at: request.started_at,
                finished_at: if is_recommendation {
                    None
                } else {
                    request.finished_at
                },
            })
            .await?;

        info!("Added {} '{}' for user {}", item.item_type, item.title, user_id);
        Ok(CreateOutcome {
            item,
            existing: false,
        })
    }

    /// Apply a partial update to one of the user's items.
    pub async fn update(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        request: &UpdateTrackerItemRequest,
    ) -> Result<TrackerItem> {
        let mut item = self
            .store
            .find_for_user(user_id, item_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Tracker item not found".to_string()))?;

        apply_update(&mut item, request)?;
        let item = self.store.update(&item).await?;

        debug!("Updated tracker item {} for user {}", item.id, user_id);
        Ok(item)
    }

    pub async fn delete(&self, user_id: Uuid, item_id: Uuid) -> Result<()> {
        if self.store.find_for_user(user_id, item_id).await?.is_none() {
            return Err(ApiError::NotFound("Tracker item not found".to_string()));
        }

        self.store.delete(item_id).await?;
        info!("Deleted tracker item {} for user {}", item_id, user_id);
        Ok(())
    }
}

/// Merge a patch into an item, keeping status and the recommendation flag
/// consistent: recommendations are planned and unfinished, completed items are
/// never recommendations.
fn apply_update(item: &mut TrackerItem, request: &UpdateTrackerItemRequest) -> Result<()> {
    if let Some(title) = &request.title {
        let title = title.trim();
        let title_normalized = normalize_title(title);
        if title.is_empty() || title_normalized.is_empty() {
            return Err(ApiError::InvalidInput("Invalid title".to_string()));
        }
        item.title = title.to_string();
        item.title_normalized = title_normalized;
    }

    if let Some(item_type) = &request.item_type {
        item.item_type = item_type
            .parse()
            .map_err(|_| ApiError::InvalidInput("Invalid type".to_string()))?;
    }

    let mut status = match &request.status {
        Some(status) => Some(
            status
                .parse::<TrackerStatus>()
                .map_err(|_| ApiError::InvalidInput("Invalid status".to_string()))?,
        ),
        None => None,
    };

    if let Some(creator) = trimmed(request.creator.as_ref()) {
        item.creator = Some(creator);
    }
    if let Some(rating) = request.rating {
        item.rating = Some(rating);
    }
    if let Some(notes) = trimmed(request.notes.as_ref()) {
        item.notes = Some(notes);
    }
    if let Some(tags) = &request.tags {
        item.tags = tags.clone();
    }

    let mut is_recommendation = request.is_recommendation;
    let mut clear_finished = false;
    if is_recommendation == Some(true) {
        status = Some(TrackerStatus::Planned);
        clear_finished = true;
    }

    if let Some(started_at) = request.started_at {
        item.started_at = Some(started_at);
    }
    if let Some(finished_at) = request.finished_at {
        item.finished_at = Some(finished_at);
    }
    if clear_finished {
        item.finished_at = None;
    }

    if status == Some(TrackerStatus::Completed) {
        is_recommendation = Some(false);
    }
    if is_recommendation == Some(false) && status != Some(TrackerStatus::Completed) {
        status = Some(TrackerStatus::Completed);
    }

    if let Some(status) = status {
        item.status = status;
    }
    if let Some(is_recommendation) = is_recommendation {
        item.is_recommendation = is_recommendation;
    }

    Ok(())
}
