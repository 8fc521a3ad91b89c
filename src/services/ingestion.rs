use crate::{
    error::Result,
    models::{
        IngestionSummary, NewTrackerItem, RecommendationCandidate, TrackerSource, TrackerStatus,
    },
    services::{
        extractor::{extract_recommendation_candidates, normalize_title},
        tracker_store::TrackerStore,
    },
};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

const SAVE_FAILED: &str = "Recommendations could not be saved.";

/// Turns media mentions in note text into planned library items
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn TrackerStore>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self { store }
    }

    /// Extract candidates from `text` and store the ones the user doesn't have yet.
    ///
    /// Best-effort: a store failure stops the loop and is reported in the summary.
    /// Items inserted before the failure are kept.
    pub async fn ingest(
        &self,
        user_id: Uuid,
        text: &str,
        source_note_id: Option<Uuid>,
    ) -> IngestionSummary {
        let candidates = extract_recommendation_candidates(text);
        debug!(
            "Extracted {} recommendation candidates for user {}",
            candidates.len(),
            user_id
        );

        let mut summary = IngestionSummary::default();
        if let Err(e) = self
            .save_candidates(user_id, &candidates, source_note_id, &mut summary)
            .await
        {
            error!("Recommendation extraction failed: {}", e);
            summary.error = Some(SAVE_FAILED.to_string());
        }

        info!(
            "Recommendation ingestion for user {}: created={}, skipped={}",
            user_id, summary.created, summary.skipped
        );
        summary
    }

    async fn save_candidates(
        &self,
        user_id: Uuid,
        candidates: &[RecommendationCandidate],
        source_note_id: Option<Uuid>,
        summary: &mut IngestionSummary,
    ) -> Result<()> {
        for candidate in candidates {
            let title_normalized = normalize_title(&candidate.title);
            if title_normalized.is_empty() {
                summary.skipped += 1;
                continue;
            }

            if self
                .store
                .find_by_key(user_id, candidate.item_type, &title_normalized)
                .await?
                .is_some()
            {
                summary.skipped += 1;
                continue;
            }

            self.store
                .insert(NewTrackerItem {
                    user_id,
                    item_type: candidate.item_type,
                    status: TrackerStatus::Planned,
                    title: candidate.title.clone(),
                    title_normalized,
                    creator: None,
                    rating: None,
                    notes: None,
                    tags: Vec::new(),
                    source: TrackerSource::NoteAuto,
                    is_recommendation: true,
                    source_note_id,
                    started_at: None,
                    finished_at: None,
                })
                .await?;

            summary.created += 1;
        }

        Ok(())
    }
}
