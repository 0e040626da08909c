//! # contract: capability traits and the data that crosses them
//!
//! The synchroniser talks to three external collaborators, each modelled as an
//! async trait so alternate backends (and test mocks) can be swapped in:
//!
//! - [`SourceTree`]: lists directory entries and returns file bytes.
//! - [`Summariser`]: turns raw file text into a short summary.
//! - [`NoteStore`]: the remote page tree (Notion in production).
//!
//! ## Mocking & Testing
//! - Traits are annotated for `mockall` so consumers can generate deterministic mocks.
//!   Mocks are exported with the `test-export-mocks` feature (on by default).
//!
//! ## Errors
//! - All capability methods return boxed errors, mirroring how concrete clients surface
//!   transport, status and decoding failures without a shared error enum.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mockall::automock;

/// Boxed error returned by [`SourceTree`] implementations.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed error returned by [`NoteStore`] implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed error returned by [`Summariser`] implementations.
pub type SummaryError = Box<dyn std::error::Error + Send + Sync>;

/// Whether a source tree entry is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

/// One node of a directory listing.
///
/// Entries are re-fetched on every descent; nothing holds on to them across listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File or directory name (the last path component).
    pub name: String,
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn dir(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    /// Lower-cased text after the last `.`, or the whole lower-cased name when there is no dot.
    pub fn extension(&self) -> String {
        file_extension(&self.name)
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Lower-cased substring after the last `.` of `name`.
pub fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

/// A page in the remote document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemotePage {
    pub id: String,
    pub title: String,
    pub parent_id: String,
}

/// Type of a child returned when listing a remote page or block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKind {
    /// A sub-page. Sub-pages survive content replacement.
    ChildPage { title: String },
    /// Any other block type, named as the remote service names it (`code`, `heading_2`, ...).
    Other(String),
}

/// One listed child of a remote page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildBlock {
    pub id: String,
    pub kind: ChildKind,
}

impl ChildBlock {
    pub fn child_page(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ChildKind::ChildPage {
                title: title.into(),
            },
        }
    }

    pub fn other(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ChildKind::Other(block_type.into()),
        }
    }

    pub fn is_child_page(&self) -> bool {
        matches!(self.kind, ChildKind::ChildPage { .. })
    }
}

/// A write-only unit of remote content, built fresh on every sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Heading {
        text: String,
    },
    /// A code block. Every `rich_text` item is within the segment ceiling and the
    /// item count is within the per-block ceiling.
    Code {
        language: String,
        rich_text: Vec<String>,
    },
}

/// The transient per-file working set, dropped once the file's page is written.
#[derive(Debug, Clone)]
pub struct SyncUnit {
    pub file_name: String,
    pub extension: String,
    pub raw_content: String,
    pub summary_text: String,
}

/// Read-only access to a source repository.
///
/// An empty `path` means the repository root.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceTree: Send + Sync {
    /// List the direct children of `path`, in the provider's own order.
    async fn list_children(&self, path: &str) -> Result<Vec<TreeEntry>, SourceError>;

    /// Return the raw bytes of the file at `path`.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError>;
}

/// An AI model that produces a short summary of a source file.
///
/// Implementations make a single attempt; size ceilings, retries and fallback
/// text are applied by [`crate::summarise::GuardedSummariser`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Summariser: Send + Sync {
    async fn summarise(&self, raw: &str) -> Result<String, SummaryError>;
}

/// The remote page tree.
///
/// Implementations perform exactly one remote request per call. Rate limiting and
/// retries are the caller's job (see [`crate::executor::RateLimitedExecutor`]).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// List up to `page_size` children of a page or block. Never follows pagination cursors.
    async fn list_children(
        &self,
        block_id: &str,
        page_size: usize,
    ) -> Result<Vec<ChildBlock>, StoreError>;

    /// Create a page titled `title` under `parent_id`.
    async fn create_page(&self, title: &str, parent_id: &str) -> Result<RemotePage, StoreError>;

    /// Delete (archive) a single block.
    async fn delete_block(&self, block_id: &str) -> Result<(), StoreError>;

    /// Append `blocks` to the end of `block_id`'s children, in order.
    ///
    /// Callers keep `blocks` within the per-request ceiling.
    async fn append_blocks(
        &self,
        block_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), StoreError>;
}
