use crate::{
    error::ApiError,
    models::{ExtractRequest, ExtractResponse, UserScope},
    services::{extract_recommendation_candidates, IngestionService},
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

pub const MAX_TEXT_LENGTH: usize = 50_000;

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/recommendations")
            .route("/extract", web::post().to(extract_candidates))
            .route("/ingest", web::post().to(ingest_recommendations)),
    );
}

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("No text provided".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(
            "Text exceeds maximum length (50,000 characters)".to_string(),
        ));
    }
    Ok(())
}

/// Find media mentions in free text without storing anything
#[utoipa::path(
    post,
    path = "/api/recommendations/extract",
    tag = "Recommendations",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Candidates found in the text", body = ExtractResponse),
        (status = 400, description = "Missing or oversized text", body = ErrorResponse),
    )
)]
pub async fn extract_candidates(request: Json<ExtractRequest>) -> Result<HttpResponse, ApiError> {
    validate_text(&request.text)?;

    Ok(HttpResponse::Ok().json(ExtractResponse {
        candidates: extract_recommendation_candidates(&request.text),
    }))
}

/// Store media mentions from a note as planned library items
///
/// Storage failures don't fail the request; they are reported in the summary's
/// `error` field.
#[utoipa::path(
    post,
    path = "/api/recommendations/ingest",
    tag = "Recommendations",
    params(UserScope),
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Ingestion summary", body = IngestionSummary),
        (status = 400, description = "Missing or oversized text", body = ErrorResponse),
    )
)]
pub async fn ingest_recommendations(
    scope: web::Query<UserScope>,
    request: Json<ExtractRequest>,
    ingestion_service: web::Data<IngestionService>,
) -> Result<HttpResponse, ApiError> {
    validate_text(&request.text)?;

    let summary = ingestion_service
        .ingest(scope.user_id, &request.text, request.source_note_id)
        .await;

    Ok(HttpResponse::Ok().json(summary))
}
