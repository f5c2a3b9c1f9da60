//! Backend API: wire types and the HTTP client.
//!
//! - [`ChatBackend`]: the seam the dispatchers talk to
//! - [`HttpBackend`]: reqwest implementation for `/api/chat` and `/api/upload`

pub mod client;
pub mod types;

pub use client::{ChatBackend, Endpoint, HttpBackend};
pub use types::{ChatRequest, ChatResponse, STATUS_SUCCESS, UploadFile, UploadResponse};
