//! Chat Widget Client
//!
//! A chat widget that keeps a conversation transcript, sends user messages to
//! a backend chat endpoint, uploads single files to a backend upload endpoint,
//! and shows a typing indicator while a request is in flight.
//!
//! # Architecture
//!
//! - **Core**: session identity, transcript, and the two dispatchers
//! - **Backend client**: reqwest client for `/api/chat` and `/api/upload`
//! - **Front-ends**: a terminal loop, and an Axum server that serves the
//!   browser page and forwards its API calls
//!
//! # Modules
//!
//! - [`session`]: per-widget correlation token
//! - [`transcript`]: ordered entries, typing indicator, change events
//! - [`api`]: wire types and the backend client
//! - [`widget`]: chat and upload dispatchers
//! - [`terminal`]: stdin/stdout front-end
//! - [`page`]: browser widget page
//! - [`server`]: page server and API forwarding

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod api;
pub mod config;
pub mod error;
pub mod page;
pub mod server;
pub mod session;
pub mod terminal;
pub mod transcript;
pub mod widget;

pub use error::{Error, Result};
pub use session::SessionIdentity;
pub use transcript::{Origin, Transcript, TranscriptEntry, TranscriptEvent};
pub use widget::ChatWidget;
