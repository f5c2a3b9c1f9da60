//! In-process mock of the chat backend, served on an ephemeral port.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::{Value, json};
use tokio::sync::Semaphore;

/// One multipart upload as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub user_id: String,
}

/// Requests received by the mock, plus an optional gate that holds chat
/// replies until the test releases them.
#[derive(Debug, Default)]
pub struct MockBackend {
    pub chats: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub gate: Option<Semaphore>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    /// Let one held chat reply through.
    pub fn release_one(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn chat_count(&self) -> usize {
        self.chats.lock().unwrap().len()
    }

    pub fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .chats
            .lock()
            .unwrap()
            .iter()
            .map(|c| c["user_id"].as_str().unwrap_or_default().to_string())
            .collect();
        ids.extend(self.uploads.lock().unwrap().iter().map(|u| u.user_id.clone()));
        ids
    }
}

/// Router implementing `/api/chat` and `/api/upload`.
///
/// Chat: `"fail"` gets `{"status":"error"}`, anything else is echoed back.
/// Upload: `big.bin` is rejected, `empty.txt` gets `{}`, anything else succeeds.
pub fn mock_router(backend: Arc<MockBackend>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/upload", post(upload))
        .with_state(backend)
}

async fn chat(State(backend): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Json<Value> {
    backend.chats.lock().unwrap().push(body.clone());

    if let Some(gate) = &backend.gate {
        gate.acquire().await.unwrap().forget();
    }

    let message = body["message"].as_str().unwrap_or_default();
    if message == "fail" {
        Json(json!({ "status": "error", "response": "boom" }))
    } else {
        Json(json!({ "status": "success", "response": format!("echo: {message}") }))
    }
}

async fn upload(State(backend): State<Arc<MockBackend>>, mut multipart: Multipart) -> Json<Value> {
    let mut recorded = RecordedUpload {
        file_name: String::new(),
        content_type: String::new(),
        bytes: Vec::new(),
        user_id: String::new(),
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                recorded.file_name = field.file_name().unwrap_or_default().to_string();
                recorded.content_type = field.content_type().unwrap_or_default().to_string();
                recorded.bytes = field.bytes().await.unwrap().to_vec();
            }
            Some("user_id") => recorded.user_id = field.text().await.unwrap(),
            _ => {}
        }
    }

    let reply = match recorded.file_name.as_str() {
        "big.bin" => json!({ "error": "Too large" }),
        "empty.txt" => json!({}),
        _ => json!({ "message": "File received" }),
    };
    backend.uploads.lock().unwrap().push(recorded);
    Json(reply)
}

/// Router whose chat endpoint answers 500 with an HTML page.
pub fn html_error_router() -> Router {
    Router::new().route(
        "/api/chat",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "<html><body>Oops</body></html>") }),
    )
}

/// Router whose chat endpoint answers 500 with a JSON error body.
pub fn json_error_router() -> Router {
    Router::new().route(
        "/api/chat",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error" })),
            )
                .into_response()
        }),
    )
}

/// Router whose replies are JSON with fields of unexpected types.
///
/// Chat answers `{"status":"error","response":42}`; upload answers
/// `{"message":""}`.
pub fn odd_types_router() -> Router {
    Router::new()
        .route(
            "/api/chat",
            post(|| async { Json(json!({ "status": "error", "response": 42 })) }),
        )
        .route(
            "/api/upload",
            post(|| async { Json(json!({ "message": "" })) }),
        )
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port; returns its base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing is listening on.
pub async fn closed_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
