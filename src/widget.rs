//! Chat and upload dispatchers.
//!
//! [`ChatWidget`] ties a [`SessionIdentity`], a [`Transcript`] and a
//! [`ChatBackend`] together. Both dispatchers follow the same cycle:
//!
//! ```text
//! Idle --submit/upload--> Pending (indicator shown) --reply/failure--> Idle (indicator hidden, entry appended)
//! ```
//!
//! Dispatches are independent. Nothing serializes two submits, so replies land
//! in completion order.

use std::sync::Arc;

use crate::api::{ChatBackend, ChatRequest, UploadFile};
use crate::config::WidgetConfig;
use crate::session::SessionIdentity;
use crate::transcript::{Origin, Transcript, TranscriptEntry};

/// Shown when the chat endpoint answers with a non-success status.
pub const CHAT_ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Shown when the chat endpoint cannot be reached or answers with non-JSON.
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Sorry, I'm having trouble connecting. Please try again later.";

/// Shown when an upload fails or its reply carries neither `message` nor `error`.
pub const UPLOAD_ERROR_MESSAGE: &str = "Sorry, there was an error uploading your file.";

/// User entry appended when an upload starts.
pub fn uploading_text(file_name: &str) -> String {
    format!("Uploading {file_name}...")
}

/// A chat widget bound to one session.
///
/// Cheap to clone; clones share the session, transcript and backend, so a
/// front-end can hand one to each spawned dispatch.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use chat_widget::api::HttpBackend;
/// use chat_widget::widget::ChatWidget;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let widget = ChatWidget::new(Arc::new(HttpBackend::new("http://localhost:5000")?));
/// if let Some(reply) = widget.submit("Hello").await {
///     println!("{}", reply.text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChatWidget {
    session: SessionIdentity,
    transcript: Transcript,
    backend: Arc<dyn ChatBackend>,
}

impl ChatWidget {
    /// Create a widget with a fresh session and an empty, uncapped transcript.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_transcript(backend, Transcript::new())
    }

    /// Create a widget around an existing transcript.
    pub fn with_transcript(backend: Arc<dyn ChatBackend>, transcript: Transcript) -> Self {
        Self {
            session: SessionIdentity::generate(),
            transcript,
            backend,
        }
    }

    /// Create a widget from the `widget` configuration section.
    ///
    /// Applies the entry cap and opens the transcript with the greeting.
    pub fn from_config(backend: Arc<dyn ChatBackend>, config: &WidgetConfig) -> Self {
        let transcript = Transcript::with_max_entries(config.max_entries);
        if let Some(greeting) = config.greeting() {
            transcript.append_entry(greeting, Origin::Bot);
        }
        Self::with_transcript(backend, transcript)
    }

    /// The identity sent with every request from this widget.
    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    /// The widget's transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Submit the contents of an input field.
    ///
    /// A blank field is left untouched and nothing is sent. Otherwise the
    /// field is cleared once the user entry is on screen, before the request
    /// goes out.
    pub async fn submit_input(&self, field: &mut String) -> Option<TranscriptEntry> {
        let message = field.trim().to_string();
        if message.is_empty() {
            return None;
        }
        self.transcript.append_entry(message.as_str(), Origin::User);
        field.clear();
        Some(self.dispatch_chat(message).await)
    }

    /// Send one chat message.
    ///
    /// Returns the bot entry appended for the reply, or `None` when the
    /// trimmed text is empty and nothing was sent.
    pub async fn submit(&self, text: &str) -> Option<TranscriptEntry> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }
        self.transcript.append_entry(message, Origin::User);
        Some(self.dispatch_chat(message.to_string()).await)
    }

    async fn dispatch_chat(&self, message: String) -> TranscriptEntry {
        self.transcript.show_pending_indicator();

        tracing::debug!(
            name: "chat.dispatch",
            user_id = %self.session,
            message_length = message.len(),
            "Sending chat message"
        );

        let request = ChatRequest {
            user_id: self.session.to_string(),
            message,
        };

        let text = match self.backend.send_chat(&request).await {
            Ok(reply) if reply.is_success() => reply.response.unwrap_or_default(),
            Ok(reply) => {
                tracing::error!(
                    name: "chat.failed",
                    user_id = %self.session,
                    status = %reply.status,
                    "Chat endpoint reported a non-success status"
                );
                CHAT_ERROR_MESSAGE.to_string()
            }
            Err(e) => {
                tracing::error!(
                    name: "chat.failed",
                    user_id = %self.session,
                    error = %e,
                    "Chat request failed"
                );
                CONNECTION_ERROR_MESSAGE.to_string()
            }
        };

        self.transcript.hide_pending_indicator();
        self.transcript.append_entry(text, Origin::Bot)
    }

    /// Upload one file.
    ///
    /// Returns the bot entry appended for the outcome.
    pub async fn upload(&self, file: UploadFile) -> TranscriptEntry {
        self.transcript
            .append_entry(uploading_text(&file.file_name), Origin::User);
        self.transcript.show_pending_indicator();

        let file_name = file.file_name.clone();
        tracing::debug!(
            name: "upload.dispatch",
            user_id = %self.session,
            file_name = %file_name,
            size = file.bytes.len(),
            "Uploading file"
        );

        let text = match self.backend.upload_file(file, &self.session).await {
            Ok(reply) => {
                if let Some(text) = reply.display_text() {
                    text.to_string()
                } else {
                    tracing::error!(
                        name: "upload.failed",
                        user_id = %self.session,
                        file_name = %file_name,
                        "Upload reply carried neither message nor error"
                    );
                    UPLOAD_ERROR_MESSAGE.to_string()
                }
            }
            Err(e) => {
                tracing::error!(
                    name: "upload.failed",
                    user_id = %self.session,
                    file_name = %file_name,
                    error = %e,
                    "Upload request failed"
                );
                UPLOAD_ERROR_MESSAGE.to_string()
            }
        };

        self.transcript.hide_pending_indicator();
        self.transcript.append_entry(text, Origin::Bot)
    }
}
