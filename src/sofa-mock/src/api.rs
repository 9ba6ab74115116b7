use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;

use sofa_core::models::{ErrorResponse, WriteResponse};

use crate::store::{MockStore, StoreError};

/// Shared application state
pub struct AppState {
    pub store: Mutex<MockStore>,
}

impl AppState {
    pub fn new(store: MockStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }
}

fn error_response(e: StoreError) -> HttpResponse {
    let status = match e {
        StoreError::DatabaseNotFound | StoreError::DocumentNotFound | StoreError::ViewNotFound => {
            StatusCode::NOT_FOUND
        }
        StoreError::DatabaseExists => StatusCode::PRECONDITION_FAILED,
        StoreError::IllegalDatabaseName(_) | StoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
        StoreError::Conflict => StatusCode::CONFLICT,
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: e.code().to_string(),
        reason: e.to_string(),
    })
}

fn bad_request(reason: impl Into<String>) -> HttpResponse {
    error_response(StoreError::BadRequest(reason.into()))
}

fn etag(rev: &str) -> (header::HeaderName, String) {
    (header::ETAG, format!("\"{}\"", rev))
}

/// Database info
/// GET /{db}/
#[tracing::instrument(skip(path, state))]
pub async fn get_database(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db_name = path.into_inner();

    let store = state.store.lock().await;
    match store.database_info(&db_name) {
        Ok(info) => Ok(HttpResponse::Ok().json(info)),
        Err(e) => Ok(error_response(e)),
    }
}

/// Create a database
/// PUT /{db}/
#[tracing::instrument(skip(path, state))]
pub async fn create_database(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db_name = path.into_inner();
    tracing::debug!(db = %db_name, "Creating database");

    let mut store = state.store.lock().await;
    match store.create_database(&db_name) {
        Ok(()) => {
            tracing::info!(db = %db_name, "Database created");
            Ok(HttpResponse::Created().json(json!({"ok": true})))
        }
        Err(e) => Ok(error_response(e)),
    }
}

/// Delete a database
/// DELETE /{db}/
#[tracing::instrument(skip(path, state))]
pub async fn delete_database(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db_name = path.into_inner();
    tracing::debug!(db = %db_name, "Deleting database");

    let mut store = state.store.lock().await;
    match store.delete_database(&db_name) {
        Ok(()) => {
            tracing::info!(db = %db_name, "Database deleted");
            Ok(HttpResponse::Ok().json(json!({"ok": true})))
        }
        Err(e) => Ok(error_response(e)),
    }
}

/// Document revision
/// HEAD /{db}/{doc_id}
pub async fn head_document(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db_name, doc_id) = path.into_inner();

    let store = state.store.lock().await;
    match store.get_document(&db_name, &doc_id) {
        Ok(doc) => Ok(HttpResponse::Ok().insert_header(etag(&doc.rev)).finish()),
        Err(e) => Ok(HttpResponse::build(error_response(e).status()).finish()),
    }
}

/// Get a document
/// GET /{db}/{doc_id}
#[tracing::instrument(skip(path, state))]
pub async fn get_document(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db_name, doc_id) = path.into_inner();
    tracing::debug!(db = %db_name, doc_id = %doc_id, "Getting document");

    let store = state.store.lock().await;
    match store.get_document(&db_name, &doc_id) {
        Ok(doc) => Ok(HttpResponse::Ok()
            .insert_header(etag(&doc.rev))
            .json(doc.to_json(&doc_id))),
        Err(e) => Ok(error_response(e)),
    }
}

/// Create or update a document
/// PUT /{db}/{doc_id}
#[tracing::instrument(skip(path, body, state))]
pub async fn put_document(
    path: web::Path<(String, String)>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db_name, doc_id) = path.into_inner();
    tracing::debug!(db = %db_name, doc_id = %doc_id, "Storing document");

    let doc: Value = match serde_json::from_slice(&body) {
        Ok(doc) => doc,
        Err(e) => return Ok(bad_request(format!("invalid UTF-8 JSON: {}", e))),
    };

    let mut store = state.store.lock().await;
    match store.put_document(&db_name, &doc_id, doc) {
        Ok(rev) => Ok(HttpResponse::Created()
            .insert_header(etag(&rev))
            .json(WriteResponse {
                ok: true,
                id: doc_id,
                rev,
            })),
        Err(e) => {
            tracing::warn!(db = %db_name, "Document write rejected: {}", e);
            Ok(error_response(e))
        }
    }
}

/// Delete a document at the revision given by `If-Match` or `?rev=`
/// DELETE /{db}/{doc_id}
#[tracing::instrument(skip(path, query, state, http_req))]
pub async fn delete_document(
    path: web::Path<(String, String)>,
    query: web::Query<HashMap<String, String>>,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> ActixResult<HttpResponse> {
    let (db_name, doc_id) = path.into_inner();
    tracing::debug!(db = %db_name, doc_id = %doc_id, "Deleting document");

    let rev = http_req
        .headers()
        .get(header::IF_MATCH)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .map(|v| v.replace('"', ""))
        .or_else(|| query.get("rev").cloned());

    let mut store = state.store.lock().await;
    match store.delete_document(&db_name, &doc_id, rev.as_deref()) {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({"ok": true, "id": doc_id}))),
        Err(e) => Ok(error_response(e)),
    }
}

/// List all documents
/// GET /{db}/_all_docs
pub async fn all_docs(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db_name = path.into_inner();

    let store = state.store.lock().await;
    match store.all_docs(&db_name) {
        Ok(all) => Ok(HttpResponse::Ok().json(all)),
        Err(e) => Ok(error_response(e)),
    }
}

/// Query a view
/// GET /{db}/_design/{ddoc}/_view/{view}?startkey=..&endkey=..
#[tracing::instrument(skip(path, query, state))]
pub async fn query_view(
    path: web::Path<(String, String, String)>,
    query: web::Query<HashMap<String, String>>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db_name, design, view) = path.into_inner();

    let mut bounds = [None, None];
    for (slot, param) in bounds.iter_mut().zip(["startkey", "endkey"]) {
        if let Some(raw) = query.get(param) {
            match serde_json::from_str::<Value>(raw) {
                Ok(key) => *slot = Some(key),
                Err(e) => return Ok(bad_request(format!("invalid {}: {}", param, e))),
            }
        }
    }
    let [start, end] = bounds;
    tracing::debug!(db = %db_name, design = %design, view = %view, ?start, ?end, "Querying view");

    let store = state.store.lock().await;
    match store.query_view(&db_name, &design, &view, start.as_ref(), end.as_ref()) {
        Ok(rows) => Ok(HttpResponse::Ok().json(rows)),
        Err(e) => Ok(error_response(e)),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Specific named routes MUST come before the generic /{db}/{doc_id}
    cfg.route("/{db}/_all_docs", web::get().to(all_docs))
        .route(
            "/{db}/_design/{ddoc}/_view/{view}",
            web::get().to(query_view),
        )
        .route("/{db}/{doc_id}", web::head().to(head_document))
        .route("/{db}/{doc_id}", web::get().to(get_document))
        .route("/{db}/{doc_id}", web::put().to(put_document))
        .route("/{db}/{doc_id}", web::delete().to(delete_document));

    for root in ["/{db}/", "/{db}"] {
        cfg.route(root, web::get().to(get_database))
            .route(root, web::put().to(create_database))
            .route(root, web::delete().to(delete_database));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    fn app_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(MockStore::new().with_view(
            "app",
            "by_name",
            |doc| match doc.get("name") {
                Some(name) => vec![(name.clone(), Value::Null)],
                None => Vec::new(),
            },
        )))
    }

    #[actix_web::test]
    async fn test_database_lifecycle() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/tests/").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put().uri("/tests/").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::put().uri("/tests/").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::PRECONDITION_FAILED
        );

        let req = test::TestRequest::get().uri("/tests/").to_request();
        let info: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info["db_name"], "tests");

        let req = test::TestRequest::delete().uri("/tests/").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete().uri("/tests/").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_document_write_and_read() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;
        let req = test::TestRequest::put().uri("/tests/").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::put()
            .uri("/tests/doc1")
            .set_json(json!({"_id": "doc1", "name": "a"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let etag = resp.headers().get(header::ETAG).unwrap().to_str().unwrap().to_string();
        assert!(etag.starts_with("\"1-"));

        let req = test::TestRequest::default()
            .method(actix_web::http::Method::HEAD)
            .uri("/tests/doc1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::ETAG).unwrap().to_str().unwrap(), etag);

        let req = test::TestRequest::get().uri("/tests/doc1").to_request();
        let doc: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(doc["_id"], "doc1");
        assert_eq!(doc["name"], "a");

        let req = test::TestRequest::put()
            .uri("/tests/doc1")
            .set_json(json!({"name": "b"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::delete()
            .uri("/tests/doc1")
            .insert_header((header::IF_MATCH, etag.replace('"', "")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/tests/doc1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_view_query_params() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;
        let req = test::TestRequest::put().uri("/tests/").to_request();
        test::call_service(&app, req).await;

        for (id, name) in [("x", "a"), ("y", "b"), ("z", "c")] {
            let req = test::TestRequest::put()
                .uri(&format!("/tests/{}", id))
                .set_json(json!({"name": name}))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/tests/_design/app/_view/by_name?startkey=%22b%22")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_rows"], 3);
        assert_eq!(body["offset"], 1);
        assert_eq!(body["rows"].as_array().unwrap().len(), 2);
        assert_eq!(body["rows"][0]["id"], "y");

        let req = test::TestRequest::get()
            .uri("/tests/_design/app/_view/by_name?endkey=oops")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/tests/_design/app/_view/missing")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/tests/_all_docs").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"][2]["id"], "z");
    }
}
