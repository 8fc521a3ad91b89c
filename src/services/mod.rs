pub mod extractor;
pub mod import;
pub mod ingestion;
pub mod library;
pub mod memory_store;
pub mod tracker_store;

// Re-export public types
pub use extractor::{clean_title, extract_recommendation_candidates, normalize_title};
pub use import::ImportMode;
pub use ingestion::IngestionService;
pub use library::{CreateOutcome, LibraryService};
pub use memory_store::MemoryTrackerStore;
pub use tracker_store::{PostgresTrackerStore, TrackerStore};
