//! End-to-end dispatcher behavior against a real HTTP backend.

mod common;

use std::sync::Arc;

use chat_widget::api::{HttpBackend, UploadFile};
use chat_widget::transcript::{Origin, TranscriptEvent};
use chat_widget::widget::{
    CHAT_ERROR_MESSAGE, CONNECTION_ERROR_MESSAGE, ChatWidget, UPLOAD_ERROR_MESSAGE,
};
use common::{
    MockBackend, closed_backend, html_error_router, json_error_router, mock_router,
    odd_types_router, spawn_backend, wait_until,
};
use serde_json::json;

async fn widget_for(base_url: &str) -> ChatWidget {
    ChatWidget::new(Arc::new(HttpBackend::new(base_url).unwrap()))
}

fn is_session_token(id: &str) -> bool {
    id.strip_prefix("user_").is_some_and(|s| {
        s.len() == 9 && s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
    })
}

#[tokio::test]
async fn test_chat_success_round_trip() {
    let backend = MockBackend::new();
    let url = spawn_backend(mock_router(backend.clone())).await;
    let widget = widget_for(&url).await;

    let reply = widget.submit("Hello").await.unwrap();
    assert_eq!(reply.text, "echo: Hello");
    assert_eq!(reply.origin, Origin::Bot);

    let chats = backend.chats.lock().unwrap();
    assert_eq!(
        chats[0],
        json!({ "user_id": widget.session().as_str(), "message": "Hello" })
    );
}

#[tokio::test]
async fn test_chat_non_success_status() {
    let url = spawn_backend(mock_router(MockBackend::new())).await;
    let widget = widget_for(&url).await;

    let reply = widget.submit("fail").await.unwrap();
    assert_eq!(reply.text, CHAT_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_chat_json_error_on_500_is_server_error() {
    let url = spawn_backend(json_error_router()).await;
    let widget = widget_for(&url).await;

    let reply = widget.submit("Hello").await.unwrap();
    assert_eq!(reply.text, CHAT_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_chat_json_with_odd_field_types_is_server_error() {
    let url = spawn_backend(odd_types_router()).await;
    let widget = widget_for(&url).await;

    let reply = widget.submit("Hello").await.unwrap();
    assert_eq!(reply.text, CHAT_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_upload_empty_message_is_generic_failure() {
    let url = spawn_backend(odd_types_router()).await;
    let widget = widget_for(&url).await;

    let reply = widget.upload(UploadFile::new("notes.txt", b"n".to_vec())).await;
    assert_eq!(reply.text, UPLOAD_ERROR_MESSAGE);
    assert!(!widget.transcript().is_pending());
}

#[tokio::test]
async fn test_chat_html_error_is_connection_failure() {
    let url = spawn_backend(html_error_router()).await;
    let widget = widget_for(&url).await;

    let reply = widget.submit("Hello").await.unwrap();
    assert_eq!(reply.text, CONNECTION_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_chat_transport_failure() {
    let url = closed_backend().await;
    let widget = widget_for(&url).await;

    let reply = widget.submit("Hello").await.unwrap();
    assert_eq!(reply.text, CONNECTION_ERROR_MESSAGE);
    assert!(!widget.transcript().is_pending());

    // Still usable afterwards.
    assert!(widget.submit("again").await.is_some());
    assert_eq!(widget.transcript().len(), 4);
}

#[tokio::test]
async fn test_blank_input_sends_nothing() {
    let backend = MockBackend::new();
    let url = spawn_backend(mock_router(backend.clone())).await;
    let widget = widget_for(&url).await;

    assert!(widget.submit("  ").await.is_none());
    assert!(widget.transcript().is_empty());
    assert_eq!(backend.chat_count(), 0);
}

#[tokio::test]
async fn test_user_entry_and_indicator_precede_reply() {
    let backend = MockBackend::gated();
    let url = spawn_backend(mock_router(backend.clone())).await;
    let widget = widget_for(&url).await;

    let task = {
        let widget = widget.clone();
        tokio::spawn(async move { widget.submit("Hello").await })
    };

    wait_until(|| backend.chat_count() == 1).await;
    let entries = widget.transcript().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "Hello");
    assert_eq!(entries[0].origin, Origin::User);
    assert!(widget.transcript().is_pending());

    backend.release_one();
    let reply = task.await.unwrap().unwrap();
    assert_eq!(reply.text, "echo: Hello");
    assert!(!widget.transcript().is_pending());
}

#[tokio::test]
async fn test_overlapping_requests_share_one_indicator() {
    let backend = MockBackend::gated();
    let url = spawn_backend(mock_router(backend.clone())).await;
    let widget = widget_for(&url).await;
    let mut events = widget.transcript().subscribe();

    let first = {
        let widget = widget.clone();
        tokio::spawn(async move { widget.submit("one").await })
    };
    let second = {
        let widget = widget.clone();
        tokio::spawn(async move { widget.submit("two").await })
    };

    wait_until(|| backend.chat_count() == 2).await;
    backend.release_one();
    backend.release_one();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let mut shown = 0;
    let mut hidden = 0;
    let mut bot_replies = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            TranscriptEvent::IndicatorShown => shown += 1,
            TranscriptEvent::IndicatorHidden => hidden += 1,
            TranscriptEvent::EntryAppended(entry) if entry.origin == Origin::Bot => {
                // The indicator is already gone when any reply lands.
                assert_eq!(hidden, 1);
                bot_replies.push(entry.text);
            }
            _ => {}
        }
    }

    assert_eq!(shown, 1);
    assert_eq!(hidden, 1);
    bot_replies.sort();
    assert_eq!(bot_replies, ["echo: one", "echo: two"]);
}

#[tokio::test]
async fn test_upload_sends_file_and_session() {
    let backend = MockBackend::new();
    let url = spawn_backend(mock_router(backend.clone())).await;
    let widget = widget_for(&url).await;

    let reply = widget
        .upload(UploadFile::new("report.pdf", b"%PDF-1.7".to_vec()))
        .await;
    assert_eq!(reply.text, "File received");

    let entries = widget.transcript().entries();
    assert_eq!(entries[0].text, "Uploading report.pdf...");
    assert_eq!(entries[0].origin, Origin::User);

    let uploads = backend.uploads.lock().unwrap();
    assert_eq!(uploads[0].file_name, "report.pdf");
    assert_eq!(uploads[0].content_type, "application/pdf");
    assert_eq!(uploads[0].bytes, b"%PDF-1.7");
    assert_eq!(uploads[0].user_id, widget.session().as_str());
}

#[tokio::test]
async fn test_upload_error_and_empty_replies() {
    let url = spawn_backend(mock_router(MockBackend::new())).await;
    let widget = widget_for(&url).await;

    let rejected = widget.upload(UploadFile::new("big.bin", vec![0; 64])).await;
    assert_eq!(rejected.text, "Too large");

    let empty = widget.upload(UploadFile::new("empty.txt", Vec::new())).await;
    assert_eq!(empty.text, UPLOAD_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_upload_transport_failure() {
    let url = closed_backend().await;
    let widget = widget_for(&url).await;

    let reply = widget.upload(UploadFile::new("a.txt", b"a".to_vec())).await;
    assert_eq!(reply.text, UPLOAD_ERROR_MESSAGE);
    assert!(!widget.transcript().is_pending());
}

#[tokio::test]
async fn test_session_identity_stable_across_requests() {
    let backend = MockBackend::new();
    let url = spawn_backend(mock_router(backend.clone())).await;
    let widget = widget_for(&url).await;

    widget.submit("first").await;
    widget.upload(UploadFile::new("notes.txt", b"n".to_vec())).await;
    widget.submit("second").await;

    let ids = backend.user_ids();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| id == widget.session().as_str()));
    assert!(is_session_token(&ids[0]));
}

#[tokio::test]
async fn test_concurrent_submissions_all_answered() {
    let backend = MockBackend::new();
    let url = spawn_backend(mock_router(backend.clone())).await;
    let widget = widget_for(&url).await;

    let questions: Vec<String> = (0..8).map(|i| format!("question {i}")).collect();
    let replies = futures::future::join_all(questions.iter().map(|q| widget.submit(q))).await;

    assert!(replies.iter().all(Option::is_some));
    assert_eq!(widget.transcript().len(), 16);
    assert!(!widget.transcript().is_pending());

    let users = widget
        .transcript()
        .entries()
        .into_iter()
        .filter(|e| e.origin == Origin::User)
        .count();
    assert_eq!(users, 8);
}
