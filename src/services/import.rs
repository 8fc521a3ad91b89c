use crate::{
    error::{ApiError, Result},
    models::{
        parse_leading_number, ImportSummary, NewTrackerItem, TrackerSource, TrackerStatus,
        TrackerType,
    },
    services::{
        extractor::normalize_title,
        library::{LibraryService, MAX_TITLE_LENGTH},
    },
};
use chrono::Utc;
use csv::{ReaderBuilder, StringRecord, Trim};
use lazy_static::lazy_static;
use std::{collections::HashSet, str::FromStr};
use tracing::{info, warn};
use uuid::Uuid;

lazy_static! {
    static ref TITLE_ALIASES: HashSet<&'static str> = ["title", "name"].into_iter().collect();
    static ref CREATOR_ALIASES: HashSet<&'static str> =
        ["creator", "author", "director", "artist", "by", "writer"]
            .into_iter()
            .collect();
    static ref RATING_ALIASES: HashSet<&'static str> =
        ["rating", "score", "stars"].into_iter().collect();
    static ref NOTES_ALIASES: HashSet<&'static str> =
        ["notes", "note", "comments", "comment", "description"]
            .into_iter()
            .collect();
}

/// How imported rows enter the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Already finished; stored as completed
    Completed,
    /// Stored as planned recommendations
    Recommended,
}

impl FromStr for ImportMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "completed" => Ok(ImportMode::Completed),
            "recommended" => Ok(ImportMode::Recommended),
            _ => Err(ApiError::InvalidInput(
                "Mode must be 'completed' or 'recommended'".to_string(),
            )),
        }
    }
}

/// Column positions within a record. `None` means the column is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    title: usize,
    creator: Option<usize>,
    rating: Option<usize>,
    notes: Option<usize>,
}

impl ColumnMap {
    /// Title, Creator, Rating, Notes
    const POSITIONAL: ColumnMap = ColumnMap {
        title: 0,
        creator: Some(1),
        rating: Some(2),
        notes: Some(3),
    };

    /// Detect a header row by its title column. Later matches win when a header
    /// repeats an alias.
    fn from_header(record: &StringRecord) -> Option<Self> {
        let mut title = None;
        let mut creator = None;
        let mut rating = None;
        let mut notes = None;

        for (index, cell) in record.iter().enumerate() {
            let key = cell.trim().to_lowercase();
            let key = key.as_str();
            if TITLE_ALIASES.contains(key) {
                title = Some(index);
            } else if CREATOR_ALIASES.contains(key) {
                creator = Some(index);
            } else if RATING_ALIASES.contains(key) {
                rating = Some(index);
            } else if NOTES_ALIASES.contains(key) {
                notes = Some(index);
            }
        }

        title.map(|title| ColumnMap {
            title,
            creator,
            rating,
            notes,
        })
    }
}

fn cell(record: &StringRecord, column: Option<usize>) -> &str {
    column
        .and_then(|index| record.get(index))
        .map(str::trim)
        .unwrap_or_default()
}

/// Read every record up to the first malformed one. Lines with a single empty
/// field are blank and dropped; rows of empty fields such as `,,` are kept.
fn parse_records(csv_data: &[u8]) -> Result<Vec<StringRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(csv_data);

    let mut records = Vec::new();
    let mut parse_error = None;
    for result in reader.records() {
        match result {
            Ok(record) if record.len() == 1 && record[0].is_empty() => {}
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Stopped reading CSV at malformed record: {}", e);
                parse_error = Some(e);
                break;
            }
        }
    }

    if records.is_empty() {
        return Err(match parse_error {
            Some(_) => ApiError::InvalidInput("Failed to parse CSV file".to_string()),
            None => ApiError::InvalidInput("CSV file is empty".to_string()),
        });
    }

    Ok(records)
}

impl LibraryService {
    /// Import tracker items of one type from a CSV upload.
    ///
    /// Rows that can't be stored are reported in `errors` and the import carries
    /// on; titles already in the library are counted as skipped.
    pub async fn import_csv(
        &self,
        user_id: Uuid,
        item_type: &str,
        mode: &str,
        csv_data: &[u8],
    ) -> Result<ImportSummary> {
        let item_type: TrackerType = item_type
            .parse()
            .map_err(|_| ApiError::InvalidInput("Invalid type".to_string()))?;
        let mode: ImportMode = mode.parse()?;

        let records = parse_records(csv_data)?;
        let header = ColumnMap::from_header(&records[0]);
        let columns = header.unwrap_or(ColumnMap::POSITIONAL);
        let first_data_row = if header.is_some() { 1 } else { 0 };

        let is_recommendation = mode == ImportMode::Recommended;
        let status = if is_recommendation {
            TrackerStatus::Planned
        } else {
            TrackerStatus::Completed
        };
        let finished_at = if is_recommendation {
            None
        } else {
            Some(Utc::now())
        };

        let mut summary = ImportSummary::default();
        for (index, record) in records.iter().enumerate().skip(first_data_row) {
            let row_number = index + 1;

            let title = cell(record, Some(columns.title));
            if title.is_empty() {
                summary
                    .errors
                    .push(format!("Row {}: missing title, skipped", row_number));
                continue;
            }
            if title.chars().count() > MAX_TITLE_LENGTH {
                summary.errors.push(format!(
                    "Row {}: title too long (max {}), skipped",
                    row_number, MAX_TITLE_LENGTH
                ));
                continue;
            }

            let title_normalized = normalize_title(title);
            if title_normalized.is_empty() {
                summary
                    .errors
                    .push(format!("Row {}: invalid title, skipped", row_number));
                continue;
            }

            if self
                .store()
                .find_by_key(user_id, item_type, &title_normalized)
                .await?
                .is_some()
            {
                summary.skipped += 1;
                continue;
            }

            let creator = cell(record, columns.creator);
            let notes = cell(record, columns.notes);
            let rating = parse_leading_number(cell(record, columns.rating));

            self.store()
                .insert(NewTrackerItem {
                    user_id,
                    item_type,
                    status,
                    title: title.to_string(),
                    title_normalized,
                    creator: (!creator.is_empty()).then(|| creator.to_string()),
                    rating,
                    notes: (!notes.is_empty()).then(|| notes.to_string()),
                    tags: Vec::new(),
                    source: TrackerSource::Import,
                    is_recommendation,
                    source_note_id: None,
                    started_at: None,
                    finished_at,
                })
                .await?;

            summary.added += 1;
        }

        info!(
            "Imported {} items for user {}: added={}, skipped={}, errors={}",
            item_type,
            user_id,
            summary.added,
            summary.skipped,
            summary.errors.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::TrackerFilter, services::memory_store::MemoryTrackerStore};
    use std::sync::Arc;

    fn service() -> LibraryService {
        LibraryService::new(Arc::new(MemoryTrackerStore::new()))
    }

    #[test]
    fn test_header_detection() {
        let header = StringRecord::from(vec!["Notes", " Author ", "Name", "Stars"]);
        assert_eq!(
            ColumnMap::from_header(&header),
            Some(ColumnMap {
                title: 2,
                creator: Some(1),
                rating: Some(3),
                notes: Some(0),
            })
        );

        let data = StringRecord::from(vec!["Dune", "Frank Herbert"]);
        assert_eq!(ColumnMap::from_header(&data), None);
    }

    #[tokio::test]
    async fn test_import_with_header() {
        let library = service();
        let user = Uuid::new_v4();
        let csv = "Title,Director,Score,Comments\n\
                   Heat,Michael Mann,5,\"Great, tense\"\n\
                   \n\
                   Alien,Ridley Scott,not rated,\n";

        let summary = library
            .import_csv(user, "movie", "completed", csv.as_bytes())
            .await
            .unwrap();

        assert_eq!(summary.added, 2);
        assert!(summary.errors.is_empty());

        let items = library.list(user, &TrackerFilter::default()).await.unwrap();
        let heat = items.iter().find(|i| i.title == "Heat").unwrap();
        let alien = items.iter().find(|i| i.title == "Alien").unwrap();
        assert_eq!(heat.creator.as_deref(), Some("Michael Mann"));
        assert_eq!(heat.rating, Some(5.0));
        assert_eq!(heat.notes.as_deref(), Some("Great, tense"));
        assert_eq!(heat.status, TrackerStatus::Completed);
        assert_eq!(heat.source, TrackerSource::Import);
        assert!(heat.finished_at.is_some());
        assert_eq!(alien.rating, None);
        assert_eq!(alien.notes, None);
    }

    #[tokio::test]
    async fn test_import_without_header_uses_positional_columns() {
        let library = service();
        let user = Uuid::new_v4();
        let csv = "Sapiens,Yuval Noah Harari\nDune\n";

        let summary = library
            .import_csv(user, "BOOK", "recommended", csv.as_bytes())
            .await
            .unwrap();

        assert_eq!(summary.added, 2);
        let items = library.list(user, &TrackerFilter::default()).await.unwrap();
        assert!(items
            .iter()
            .all(|i| i.is_recommendation && i.status == TrackerStatus::Planned));
        assert!(items.iter().all(|i| i.finished_at.is_none()));
        assert!(items
            .iter()
            .any(|i| i.creator.as_deref() == Some("Yuval Noah Harari")));
    }

    #[tokio::test]
    async fn test_import_reports_bad_rows_and_skips_duplicates() {
        let library = service();
        let user = Uuid::new_v4();
        let long_title = "x".repeat(501);
        let csv = format!(
            "title,artist\n,Nobody\n{},Someone\n???,Band\nDive,Tycho\ndive!,Tycho\n",
            long_title
        );

        let summary = library
            .import_csv(user, "music", "completed", csv.as_bytes())
            .await
            .unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            summary.errors,
            vec![
                "Row 2: missing title, skipped".to_string(),
                "Row 3: title too long (max 500), skipped".to_string(),
                "Row 4: invalid title, skipped".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_import_argument_errors() {
        let library = service();
        let user = Uuid::new_v4();

        let bad_type = library.import_csv(user, "podcast", "completed", b"a").await;
        let bad_mode = library.import_csv(user, "book", "someday", b"a").await;
        let empty = library.import_csv(user, "book", "completed", b"\n\n").await;

        assert!(matches!(bad_type, Err(ApiError::InvalidInput(m)) if m == "Invalid type"));
        assert!(
            matches!(bad_mode, Err(ApiError::InvalidInput(m)) if m.starts_with("Mode must be"))
        );
        assert!(matches!(empty, Err(ApiError::InvalidInput(m)) if m == "CSV file is empty"));
    }

    #[tokio::test]
    async fn test_import_reads_leading_numbers_in_ratings() {
        let library = service();
        let user = Uuid::new_v4();
        let csv = "Title,Stars\nDune,4 stars\nSapiens,4.5/5\nHeat,unrated\n";

        let summary = library
            .import_csv(user, "book", "completed", csv.as_bytes())
            .await
            .unwrap();
        assert_eq!(summary.added, 3);

        let items = library.list(user, &TrackerFilter::default()).await.unwrap();
        let rating = |title: &str| items.iter().find(|i| i.title == title).unwrap().rating;
        assert_eq!(rating("Dune"), Some(4.0));
        assert_eq!(rating("Sapiens"), Some(4.5));
        assert_eq!(rating("Heat"), None);
    }

    #[tokio::test]
    async fn test_import_keeps_rows_of_empty_fields() {
        let library = service();
        let user = Uuid::new_v4();
        let csv = "Title,Author\nDune,Herbert\n,,\n,x\n";

        let summary = library
            .import_csv(user, "book", "completed", csv.as_bytes())
            .await
            .unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(
            summary.errors,
            vec![
                "Row 3: missing title, skipped".to_string(),
                "Row 4: missing title, skipped".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_import_rejects_unreadable_csv() {
        let library = service();
        let user = Uuid::new_v4();

        let result = library
            .import_csv(user, "book", "completed", b"\xff\xfe,Nobody\n")
            .await;

        assert!(matches!(result, Err(ApiError::InvalidInput(m)) if m == "Failed to parse CSV file"));
    }

    #[tokio::test]
    async fn test_import_stops_at_malformed_record() {
        let library = service();
        let user = Uuid::new_v4();

        let summary = library
            .import_csv(user, "book", "completed", b"Title\nDune\n\xff\xfe\nSapiens\n")
            .await
            .unwrap();

        assert_eq!(summary.added, 1);
        let items = library.list(user, &TrackerFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Dune");
    }
}
