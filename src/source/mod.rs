//! Remote collection sources - where snapshots come from and writes go to.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 LiveCollection (per kind)                    │
//! │  initialize() / refresh() / create() / update() / delete()  │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CollectionSource<R> trait                    │
//! │  fetch_all / create(body) / update(id, patch) / delete(id)  │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                    │
//!          ▼                                    ▼
//! ┌──────────────────┐               ┌──────────────────────────┐
//! │  InMemorySource  │               │  HttpSource (`http`)     │
//! │  tests, offline  │               │  REST + JSON envelopes   │
//! └──────────────────┘               └──────────────────────────┘
//! ```

mod endpoint;
mod envelope;
#[cfg(feature = "http")]
mod http;
mod in_memory;

use std::fmt;

use serde_json::Value;

use crate::record::Record;

pub use endpoint::{Endpoint, Method, Route};
pub use envelope::{decode_item, decode_list, error_message};
#[cfg(feature = "http")]
pub use http::HttpSource;
pub use in_memory::{InMemorySource, SourceCall};

/// Fetches a full collection and performs writes against it.
pub trait CollectionSource<R: Record>: Send + Sync {
    /// The complete current collection.
    fn fetch_all(&self) -> Result<Vec<R>, SourceError>;

    /// Create a record. Returns the stored record when the server echoes it.
    fn create(&self, body: &Value) -> Result<Option<R>, SourceError>;

    /// Update the record with key `id`. Returns the updated record when the
    /// server echoes it.
    fn update(&self, id: &str, patch: &Value) -> Result<Option<R>, SourceError>;

    fn delete(&self, id: &str) -> Result<(), SourceError>;
}

/// Failure reported by a collection source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// 401: the session token is missing or expired.
    Unauthorized(String),
    /// The request never produced a response.
    Network(String),
    /// Non-2xx response.
    Server { status: u16, message: String },
    /// A 2xx envelope with `success: false`.
    Rejected(String),
    /// The body did not match the expected shape.
    Decode(String),
    NotFound(String),
    /// The collection has no route for this operation.
    Unsupported(&'static str),
}

impl SourceError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            SourceError::Unauthorized(_) => 401,
            SourceError::Network(_) => 503,
            SourceError::Server { status, .. } => *status,
            SourceError::Rejected(_) => 422,
            SourceError::Decode(_) => 502,
            SourceError::NotFound(_) => 404,
            SourceError::Unsupported(_) => 405,
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            SourceError::Network(msg) => write!(f, "network error: {}", msg),
            SourceError::Server { status, message } => {
                write!(f, "server error {}: {}", status, message)
            }
            SourceError::Rejected(msg) => write!(f, "rejected: {}", msg),
            SourceError::Decode(msg) => write!(f, "decode failed: {}", msg),
            SourceError::NotFound(id) => write!(f, "not found: {}", id),
            SourceError::Unsupported(op) => write!(f, "operation not supported: {}", op),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}
