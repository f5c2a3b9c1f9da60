//! HTTP backend client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use url::Url;

use crate::api::types::{ChatRequest, ChatResponse, UploadFile, UploadResponse};
use crate::config::BackendConfig;
use crate::error::Result;
use crate::session::SessionIdentity;

/// The two backend operations a widget depends on.
///
/// [`HttpBackend`] is the production implementation; tests substitute
/// scripted backends.
#[async_trait]
pub trait ChatBackend: Send + Sync + fmt::Debug {
    /// Send one chat message and decode the reply.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Upload one file on behalf of `user_id` and decode the reply.
    async fn upload_file(
        &self,
        file: UploadFile,
        user_id: &SessionIdentity,
    ) -> Result<UploadResponse>;
}

/// Backend endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /api/chat`
    Chat,
    /// `POST /api/upload`
    Upload,
}

/// reqwest-backed [`ChatBackend`].
///
/// # Example
///
/// ```rust,no_run
/// use chat_widget::api::{ChatBackend, ChatRequest, HttpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new("http://localhost:5000")?;
/// let reply = backend
///     .send_chat(&ChatRequest {
///         user_id: "user_k3j9x0a1b".into(),
///         message: "Hello".into(),
///     })
///     .await?;
/// println!("{}", reply.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    chat_url: Url,
    upload_url: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a client with the default endpoint paths and no timeout.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        Self::build(
            base_url.as_ref(),
            crate::config::DEFAULT_CHAT_PATH,
            crate::config::DEFAULT_UPLOAD_PATH,
            http,
        )
    }

    /// Create a client from the `backend` configuration section.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Self::build(
            &config.base_url,
            &config.chat_path,
            &config.upload_path,
            builder.build()?,
        )
    }

    fn build(
        base_url: &str,
        chat_path: &str,
        upload_path: &str,
        http: reqwest::Client,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let chat_url = base_url.join(chat_path)?;
        let upload_url = base_url.join(upload_path)?;
        Ok(Self {
            base_url,
            chat_url,
            upload_url,
            http,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolved URL for an endpoint.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> &Url {
        match endpoint {
            Endpoint::Chat => &self.chat_url,
            Endpoint::Upload => &self.upload_url,
        }
    }

    /// Relay a raw request body to an endpoint, preserving its content type.
    ///
    /// Used by the page server so the browser can talk to same-origin paths.
    pub async fn forward(
        &self,
        endpoint: Endpoint,
        content_type: Option<&str>,
        body: impl Into<reqwest::Body>,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.post(self.endpoint_url(endpoint).clone()).body(body);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        Ok(request.send().await?)
    }

    /// Parse a JSON body regardless of the HTTP status.
    ///
    /// The backend reports failures in the body (`{"status": "error"}`), so
    /// the status code alone does not decide the outcome. Only a body that is
    /// not JSON at all is an error here.
    async fn decode(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(
            status = status.as_u16(),
            body_len = body.len(),
            "Backend response received"
        );
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .http
            .post(self.chat_url.clone())
            .json(request)
            .send()
            .await?;
        let body = Self::decode(response).await?;
        Ok(ChatResponse::from_value(&body))
    }

    async fn upload_file(
        &self,
        file: UploadFile,
        user_id: &SessionIdentity,
    ) -> Result<UploadResponse> {
        let mime = file.mime().to_string();
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&mime)?;
        let form = Form::new()
            .part("file", part)
            .text("user_id", user_id.to_string());

        let response = self
            .http
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;
        let body = Self::decode(response).await?;
        Ok(UploadResponse::from_value(&body))
    }
}
