use std::fmt;

use crate::source::SourceError;

/// Errors surfaced by live collections.
///
/// There is no merge-conflict variant: merges are last-write-wins and are
/// never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Fetching a snapshot failed. Recoverable: retried on the next poll.
    Fetch(SourceError),
    /// A create/update/delete failed. Local state is left as it was.
    Write(SourceError),
    /// The session is no longer authorized. Terminal for the session.
    Auth(String),
    /// A command was rejected locally before reaching the server.
    Invalid(String),
    /// The key is not held by the store.
    UnknownRecord { collection: String, id: String },
    LockPoisoned(&'static str),
}

impl SyncError {
    /// Classify a failed fetch.
    pub fn fetch(err: SourceError) -> Self {
        match err {
            SourceError::Unauthorized(msg) => SyncError::Auth(msg),
            other => SyncError::Fetch(other),
        }
    }

    /// Classify a failed write.
    pub fn write(err: SourceError) -> Self {
        match err {
            SourceError::Unauthorized(msg) => SyncError::Auth(msg),
            other => SyncError::Write(other),
        }
    }

    /// Whether the session may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SyncError::Auth(_))
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Fetch(e) => write!(f, "fetch failed: {}", e),
            SyncError::Write(e) => write!(f, "write failed: {}", e),
            SyncError::Auth(msg) => write!(f, "session expired: {}", msg),
            SyncError::Invalid(msg) => write!(f, "invalid command: {}", msg),
            SyncError::UnknownRecord { collection, id } => {
                write!(f, "unknown record: {}:{}", collection, id)
            }
            SyncError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Fetch(e) | SyncError::Write(e) => Some(e),
            _ => None,
        }
    }
}
