use thiserror::Error;

use crate::contract::{SourceError, StoreError};

/// Failures surfaced by the synchroniser and its helpers.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The very first listing of the repository root failed; nothing can be mirrored.
    #[error("failed to list repository root: {0}")]
    RootListing(#[source] SourceError),

    #[error("source tree error at '{path}': {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("note store error while {action}: {source}")]
    Store {
        action: String,
        #[source]
        source: StoreError,
    },

    #[error("download failed: {0}")]
    Download(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    pub fn source_at(path: impl Into<String>, source: SourceError) -> Self {
        SyncError::Source {
            path: path.into(),
            source,
        }
    }

    pub fn store(action: impl Into<String>, source: StoreError) -> Self {
        SyncError::Store {
            action: action.into(),
            source,
        }
    }
}
