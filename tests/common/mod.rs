//! Stand-in for the image search service, served by axum on a random port.
//!
//! Every request is recorded so tests can assert on exact wire shapes.
//! Failure paths are triggered by magic inputs:
//!
//! - an uploaded file named `reject.png` → 500 `upload rejected`
//! - query text `boom` → 500 `index offline`
//! - query text `garbage` → 200 with a non-JSON body
//! - delete/tags on path `store/locked.png` → 409 `image is locked`

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// One multipart field as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Images(Vec<FormField>),
    Query(Value),
    Tags(Value),
    Delete(Value),
    Asset(String),
}

#[derive(Clone, Default)]
pub struct MockService {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockService {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, r: Recorded) {
        self.requests.lock().unwrap().push(r);
    }
}

/// Start the mock service; returns it with its base URL.
pub async fn spawn() -> (MockService, String) {
    let service = MockService::default();
    let app = Router::new()
        .route("/images", post(add_images))
        .route("/query", post(query))
        .route("/tags", post(update_tags))
        .route("/delete", post(delete))
        .route("/assets/{name}", get(asset))
        .with_state(service.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (service, format!("http://{}", addr))
}

async fn add_images(State(service): State<MockService>, mut multipart: Multipart) -> Response {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        fields.push(FormField {
            name,
            file_name,
            content_type,
            text: String::from_utf8_lossy(&bytes).to_string(),
        });
    }
    let rejected = fields
        .iter()
        .any(|f| f.file_name.as_deref() == Some("reject.png"));
    let files = fields.iter().filter(|f| f.name == "files").count();
    service.record(Recorded::Images(fields));

    if rejected {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upload rejected").into_response();
    }
    Json(json!({ "added": files, "skipped": 0 })).into_response()
}

async fn query(State(service): State<MockService>, Json(body): Json<Value>) -> Response {
    service.record(Recorded::Query(body.clone()));
    match body["text"].as_str() {
        Some("boom") => (StatusCode::INTERNAL_SERVER_ERROR, "index offline").into_response(),
        Some("garbage") => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => Json(json!({
            "results": [
                { "path": "/srv/assets/sunset.png", "tags": ["sky", "evening"], "tag_match": false },
                { "path": "/srv/assets/beach.jpg", "tags": ["sea"], "tag_match": true }
            ]
        }))
        .into_response(),
    }
}

fn locked(body: &Value) -> bool {
    body["path"].as_str() == Some("store/locked.png")
}

async fn update_tags(State(service): State<MockService>, Json(body): Json<Value>) -> Response {
    service.record(Recorded::Tags(body.clone()));
    if locked(&body) {
        return (StatusCode::CONFLICT, "image is locked").into_response();
    }
    Json(json!({ "updated": true })).into_response()
}

async fn delete(State(service): State<MockService>, Json(body): Json<Value>) -> Response {
    service.record(Recorded::Delete(body.clone()));
    if locked(&body) {
        return (StatusCode::CONFLICT, "image is locked").into_response();
    }
    Json(json!({ "deleted": true })).into_response()
}

async fn asset(State(service): State<MockService>, Path(name): Path<String>) -> Response {
    service.record(Recorded::Asset(name.clone()));
    if name == "missing.png" {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }
    format!("PNG:{}", name).into_bytes().into_response()
}
