use crate::{
    error::ApiError,
    models::{
        CreateTrackerItemRequest, ImportQuery, LibraryQuery, TrackerItemResponse,
        UpdateTrackerItemRequest, UserScope,
    },
    services::LibraryService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use serde_json::json;
use uuid::Uuid;

pub fn library_config(cfg: &mut web::ServiceConfig) {
    // `/import` must be registered ahead of the `{item_id}` resource.
    cfg.service(
        web::scope("/library")
            .route("/import", web::post().to(import_items))
            .service(
                web::resource("")
                    .route(web::get().to(list_items))
                    .route(web::post().to(create_item)),
            )
            .service(
                web::resource("/{item_id}")
                    .route(web::patch().to(update_item))
                    .route(web::delete().to(delete_item)),
            ),
    );
}

/// List a user's library
#[utoipa::path(
    get,
    path = "/api/library",
    tag = "Library",
    params(LibraryQuery),
    responses(
        (status = 200, description = "Matching tracker items", body = Vec<TrackerItem>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn list_items(
    query: web::Query<LibraryQuery>,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    let items = library.list(query.user_id, &query.filter()).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// Add a book, movie or album to the library
#[utoipa::path(
    post,
    path = "/api/library",
    tag = "Library",
    params(UserScope),
    request_body = CreateTrackerItemRequest,
    responses(
        (status = 200, description = "Created item, or the existing one with `existing: true`", body = TrackerItemResponse),
        (status = 400, description = "Invalid title or type", body = ErrorResponse),
    )
)]
pub async fn create_item(
    scope: web::Query<UserScope>,
    request: Json<CreateTrackerItemRequest>,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    let outcome = library.create(scope.user_id, &request).await?;

    Ok(HttpResponse::Ok().json(TrackerItemResponse {
        item: outcome.item,
        existing: outcome.existing,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/library/{item_id}",
    tag = "Library",
    params(("item_id" = Uuid, Path, description = "Tracker item id"), UserScope),
    request_body = UpdateTrackerItemRequest,
    responses(
        (status = 200, description = "Updated item", body = TrackerItemResponse),
        (status = 400, description = "Invalid field value", body = ErrorResponse),
        (status = 404, description = "No such item for this user", body = ErrorResponse),
        (status = 409, description = "Another item already has this title", body = ErrorResponse),
    )
)]
pub async fn update_item(
    path: web::Path<Uuid>,
    scope: web::Query<UserScope>,
    request: Json<UpdateTrackerItemRequest>,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    let item = library
        .update(scope.user_id, path.into_inner(), &request)
        .await?;

    Ok(HttpResponse::Ok().json(TrackerItemResponse {
        item,
        existing: false,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/library/{item_id}",
    tag = "Library",
    params(("item_id" = Uuid, Path, description = "Tracker item id"), UserScope),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 404, description = "No such item for this user", body = ErrorResponse),
    )
)]
pub async fn delete_item(
    path: web::Path<Uuid>,
    scope: web::Query<UserScope>,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    library.delete(scope.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

/// Import items of one type from a CSV body
#[utoipa::path(
    post,
    path = "/api/library/import",
    tag = "Library",
    params(ImportQuery),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import summary", body = ImportSummary),
        (status = 400, description = "Invalid type, mode or CSV", body = ErrorResponse),
    )
)]
pub async fn import_items(
    query: web::Query<ImportQuery>,
    body: web::Bytes,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ApiError::InvalidInput("CSV file is required".to_string()));
    }

    let summary = library
        .import_csv(query.user_id, &query.item_type, &query.mode, &body)
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}
