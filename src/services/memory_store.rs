use crate::{
    error::{ApiError, Result},
    models::{NewTrackerItem, TrackerFilter, TrackerItem, TrackerType},
    services::tracker_store::TrackerStore,
};
use async_trait::async_trait;
use chrono::Utc;
use std::{cmp::Ordering, collections::HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local tracker store, used when no database is configured
#[derive(Default)]
pub struct MemoryTrackerStore {
    items: RwLock<HashMap<Uuid, TrackerItem>>,
}

impl MemoryTrackerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key_taken(
    items: &HashMap<Uuid, TrackerItem>,
    except: Option<Uuid>,
    user_id: Uuid,
    item_type: TrackerType,
    title_normalized: &str,
) -> bool {
    items.values().any(|item| {
        Some(item.id) != except
            && item.user_id == user_id
            && item.item_type == item_type
            && item.title_normalized == title_normalized
    })
}

fn conflict() -> ApiError {
    ApiError::Conflict("An item with this title already exists in the library".to_string())
}

/// `finished_at` descending with unfinished items last, then `created_at` descending.
fn library_order(a: &TrackerItem, b: &TrackerItem) -> Ordering {
    let by_finished = match (a.finished_at, b.finished_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_finished.then_with(|| b.created_at.cmp(&a.created_at))
}

#[async_trait]
impl TrackerStore for MemoryTrackerStore {
    async fn find_by_key(
        &self,
        user_id: Uuid,
        item_type: TrackerType,
        title_normalized: &str,
    ) -> Result<Option<TrackerItem>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .find(|item| {
                item.user_id == user_id
                    && item.item_type == item_type
                    && item.title_normalized == title_normalized
            })
            .cloned())
    }

    async fn find_for_user(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<TrackerItem>> {
        let items = self.items.read().await;
        Ok(items
            .get(&item_id)
            .filter(|item| item.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: Uuid, filter: &TrackerFilter) -> Result<Vec<TrackerItem>> {
        let items = self.items.read().await;
        let mut matching: Vec<TrackerItem> = items
            .values()
            .filter(|item| item.user_id == user_id && filter.matches(item))
            .cloned()
            .collect();
        matching.sort_by(library_order);
        Ok(matching)
    }

    async fn insert(&self, new: NewTrackerItem) -> Result<TrackerItem> {
        let mut items = self.items.write().await;
        if key_taken(
            &items,
            None,
            new.user_id,
            new.item_type,
            &new.title_normalized,
        ) {
            return Err(conflict());
        }

        let item = TrackerItem::from_new(new);
        items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, item: &TrackerItem) -> Result<TrackerItem> {
        let mut items = self.items.write().await;
        if !items.contains_key(&item.id) {
            return Err(ApiError::NotFound("Tracker item not found".to_string()));
        }
        if key_taken(
            &items,
            Some(item.id),
            item.user_id,
            item.item_type,
            &item.title_normalized,
        ) {
            return Err(conflict());
        }

        let mut updated = item.clone();
        updated.updated_at = Utc::now();
        items.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, item_id: Uuid) -> Result<()> {
        let mut items = self.items.write().await;
        items
            .remove(&item_id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound("Tracker item not found".to_string()))
    }
}
