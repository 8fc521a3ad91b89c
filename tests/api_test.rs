use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::StatusCode,
    test, web, App, Error,
};
use commonplace_api::{
    routes::{api_routes, json_config, openapi_route, path_config, query_config},
    services::{IngestionService, LibraryService, MemoryTrackerStore, TrackerStore},
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

fn test_app() -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let store: Arc<dyn TrackerStore> = Arc::new(MemoryTrackerStore::new());

    App::new()
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .app_data(web::Data::new(LibraryService::new(store.clone())))
        .app_data(web::Data::new(IngestionService::new(store)))
        .service(api_routes())
        .service(openapi_route())
}

#[actix_web::test]
async fn test_health() {
    let app = test::init_service(test_app()).await;
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_extract_candidates() {
    let app = test::init_service(test_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/recommendations/extract")
        .set_json(json!({ "text": "Should watch Dune tonight with Sarah, then read Sapiens." }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        body["candidates"],
        json!([
            { "type": "MOVIE", "title": "Dune", "reason": "intent" },
            { "type": "BOOK", "title": "Sapiens", "reason": "intent" }
        ])
    );
}

#[actix_web::test]
async fn test_extract_rejects_empty_text() {
    let app = test::init_service(test_app()).await;
    let req = test::TestRequest::post()
        .uri("/api/recommendations/extract")
        .set_json(json!({ "text": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No text provided");
}

#[actix_web::test]
async fn test_ingest_then_list_recommendations() {
    let app = test::init_service(test_app()).await;
    let user = Uuid::new_v4();
    let note = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri(&format!("/api/recommendations/ingest?user_id={}", user))
        .set_json(json!({
            "text": "I need to read \"Project Hail Mary\" before book club.",
            "sourceNoteId": note
        }))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary, json!({ "created": 1, "skipped": 0, "error": null }));

    let req = test::TestRequest::get()
        .uri(&format!("/api/library?user_id={}&recommendations=1&type=book", user))
        .to_request();
    let items: Value = test::call_and_read_body_json(&app, req).await;
    let items = items.as_array().unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Project Hail Mary");
    assert_eq!(items[0]["status"], "PLANNED");
    assert_eq!(items[0]["source"], "NOTE_AUTO");
    assert_eq!(items[0]["sourceNoteId"], json!(note));

    let req = test::TestRequest::get()
        .uri(&format!("/api/library?user_id={}&recommendations=false", user))
        .to_request();
    let items: Value = test::call_and_read_body_json(&app, req).await;
    assert!(items.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_library_crud() {
    let app = test::init_service(test_app()).await;
    let user = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri(&format!("/api/library?user_id={}", user))
        .set_json(json!({ "title": "Heat", "type": "movie", "rating": "4.5", "isRecommendation": true }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["item"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["item"]["rating"], 4.5);
    assert!(created.get("existing").is_none());

    let req = test::TestRequest::post()
        .uri(&format!("/api/library?user_id={}", user))
        .set_json(json!({ "title": "HEAT!", "type": "MOVIE" }))
        .to_request();
    let duplicate: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(duplicate["existing"], true);
    assert_eq!(duplicate["item"]["id"], id.as_str());

    let req = test::TestRequest::patch()
        .uri(&format!("/api/library/{}?user_id={}", id, user))
        .set_json(json!({ "status": "COMPLETED", "finishedAt": "2025-02-01" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["item"]["status"], "COMPLETED");
    assert_eq!(updated["item"]["isRecommendation"], false);

    let req = test::TestRequest::get()
        .uri(&format!("/api/library?user_id={}&year=2025", user))
        .to_request();
    let items: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(items.as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/library/{}?user_id={}", id, Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/library/{}?user_id={}", id, user))
        .to_request();
    let deleted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(deleted, json!({ "ok": true }));
}

#[actix_web::test]
async fn test_create_validation_errors() {
    let app = test::init_service(test_app()).await;
    let user = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri(&format!("/api/library?user_id={}", user))
        .set_json(json!({ "title": "Heat", "type": "podcast" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid type");
}

#[actix_web::test]
async fn test_malformed_requests_get_json_errors() {
    let app = test::init_service(test_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/library")
        .set_json(json!({ "title": "Heat", "type": "MOVIE" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("user_id"));

    let req = test::TestRequest::post()
        .uri(&format!("/api/library?user_id={}", Uuid::new_v4()))
        .set_json(json!({ "title": "Heat", "type": "MOVIE", "finishedAt": "last tuesday" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("invalid date"));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/library/not-a-uuid?user_id={}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_csv_import_rejects_unreadable_body() {
    let app = test::init_service(test_app()).await;
    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/library/import?user_id={}&type=BOOK&mode=completed",
            Uuid::new_v4()
        ))
        .insert_header(("Content-Type", "text/csv"))
        .set_payload(&b"\xff\xfe,Nobody\n"[..])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Failed to parse CSV file");
}

#[actix_web::test]
async fn test_csv_import() {
    let app = test::init_service(test_app()).await;
    let user = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/library/import?user_id={}&type=BOOK&mode=recommended",
            user
        ))
        .insert_header(("Content-Type", "text/csv"))
        .set_payload("Title,Author\nDune,Frank Herbert\n,Nobody\n")
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        summary,
        json!({ "added": 1, "skipped": 0, "errors": ["Row 3: missing title, skipped"] })
    );
}

#[actix_web::test]
async fn test_openapi_document() {
    let app = test::init_service(test_app()).await;
    let req = test::TestRequest::get()
        .uri("/api-docs/openapi.json")
        .to_request();
    let doc: Value = test::call_and_read_body_json(&app, req).await;

    assert!(doc["paths"]["/api/library"].is_object());
    assert!(doc["paths"]["/api/recommendations/extract"].is_object());
}
