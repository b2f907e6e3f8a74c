//! Upload listener
//!
//! Accepts JSON envelopes over HTTP, writes each batch to the output
//! directory and reports the outcome through the notifier bridge.

mod envelope;
mod handler;
mod server;
mod store;

pub use envelope::{UploadEnvelope, UploadResponse, DEFAULT_KIND};
pub use handler::{UploadHandler, UploadOutcome};
pub use server::{Listener, ServerError};
pub use store::{BatchStore, TIMESTAMP_FORMAT};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that fail a single upload request.
///
/// All of them end the same way: a 500 response and one `[ERROR]` line.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Invalid type label: {0:?}")]
    InvalidKind(String),

    #[error("Failed to read request body: {0}")]
    Body(std::io::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },
}
