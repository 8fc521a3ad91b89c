use crate::{
    config::Config,
    error::Result,
    handlers,
    models::{
        CandidateReason, CreateTrackerItemRequest, ErrorResponse, ExtractRequest,
        ExtractResponse, HealthResponse, ImportSummary, IngestionSummary, RecommendationCandidate,
        TrackerItem, TrackerItemResponse, TrackerSource, TrackerStatus, TrackerType,
        UpdateTrackerItemRequest,
    },
    routes::{api_routes, json_config, openapi_route, path_config, query_config},
    services::{
        IngestionService, LibraryService, MemoryTrackerStore, PostgresTrackerStore, TrackerStore,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use std::{net::TcpListener, sync::Arc};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::recommendations::extract_candidates,
        handlers::recommendations::ingest_recommendations,
        handlers::library::list_items,
        handlers::library::create_item,
        handlers::library::update_item,
        handlers::library::delete_item,
        handlers::library::import_items,
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        ExtractRequest,
        ExtractResponse,
        RecommendationCandidate,
        CandidateReason,
        IngestionSummary,
        TrackerItem,
        TrackerType,
        TrackerStatus,
        TrackerSource,
        TrackerItemResponse,
        CreateTrackerItemRequest,
        UpdateTrackerItemRequest,
        ImportSummary,
    )),
    tags(
        (name = "Recommendations", description = "Media mentions extracted from notes"),
        (name = "Library", description = "Books, movies and music tracked per user"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Connect the configured tracker store. Falls back to memory without a database.
    async fn tracker_store(&self) -> Result<Arc<dyn TrackerStore>> {
        match &self.config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(self.config.database_max_connections)
                    .connect(database_url)
                    .await
                    .context("Failed to connect to PostgreSQL")?;

                let store = PostgresTrackerStore::new(pool);
                store.ensure_schema().await?;
                info!("Using PostgreSQL tracker store");
                Ok(Arc::new(store))
            }
            None => {
                warn!("DATABASE_URL is not set; library data will only live in memory");
                Ok(Arc::new(MemoryTrackerStore::new()))
            }
        }
    }

    /// Run the server with a specific TCP listener
    /// This is useful for testing where we want to use a random port
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let store = self.tracker_store().await?;

        let library_service = web::Data::new(LibraryService::new(store.clone()));
        let ingestion_service = web::Data::new(IngestionService::new(store));

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(json_config())
                .app_data(query_config())
                .app_data(path_config())
                .app_data(library_service.clone())
                .app_data(ingestion_service.clone())
                .service(api_routes())
                .service(openapi_route())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
