//! High-level pipeline: mirrors a source tree into the remote page tree.
//!
//! This module walks the repository depth-first, pre-order, starting at the
//! configured root page, and for every kept entry:
//!   - directories with at least one eligible descendant become pages and are recursed into,
//!   - eligible files become pages holding a summary section and a source section.
//!
//! # Responsibilities
//! - Decide per entry whether to skip, recurse or sync
//! - Keep the walk going: a failure in one entry is logged, recorded in the
//!   [`SynchroniseReport`] and never aborts siblings or ancestors
//! - Only a failed listing of the repository root aborts the run
//!
//! # Ordering
//! Children are processed in the order the [`SourceTree`] returns them, one entry
//! (including its whole subtree) at a time. All remote concurrency is bounded by the
//! executor inside the [`PageRepository`].
//!
//! # Idempotency
//! Pages are found-or-created by title under their parent and file content is fully
//! replaced, so re-running against an unchanged tree converges to the same mirror.
//! This is also the recovery path after an interrupted run.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`Synchroniser`], [`SynchroniseReport`].

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::SyncConfig;
use crate::contract::{EntryKind, NoteStore, SourceTree, Summariser, SyncUnit, TreeEntry};
use crate::error::SyncError;
use crate::repository::PageRepository;
use crate::summarise::GuardedSummariser;

/// Why an entry was left out of the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Hidden,
    DisallowedExtension,
    NoEligibleFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncedPage {
    pub path: String,
    pub page_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub path: String,
    pub error: String,
}

/// Outcome of one synchronisation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SynchroniseReport {
    pub directories: Vec<SyncedPage>,
    pub files: Vec<SyncedPage>,
    pub skipped: Vec<SkippedEntry>,
    pub failures: Vec<FailedEntry>,
}

impl SynchroniseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn skip(&mut self, entry: &TreeEntry, reason: SkipReason) {
        self.skipped.push(SkippedEntry {
            path: entry.path.clone(),
            reason,
        });
    }

    fn fail(&mut self, path: &str, error: &SyncError) {
        self.failures.push(FailedEntry {
            path: path.to_string(),
            error: error.to_string(),
        });
    }
}

/// Drives the source tree, the summariser and the page repository.
pub struct Synchroniser<'a, T, S, A> {
    source: &'a T,
    pages: &'a PageRepository<S>,
    summariser: &'a GuardedSummariser<A>,
    config: &'a SyncConfig,
}

impl<'a, T, S, A> Synchroniser<'a, T, S, A>
where
    T: SourceTree,
    S: NoteStore,
    A: Summariser,
{
    pub fn new(
        source: &'a T,
        pages: &'a PageRepository<S>,
        summariser: &'a GuardedSummariser<A>,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            source,
            pages,
            summariser,
            config,
        }
    }

    /// Mirror the whole repository under `config.root_page_id`.
    pub async fn run(&self) -> Result<SynchroniseReport, SyncError> {
        let root_page_id = self.config.root_page_id.as_str();
        info!(root_page_id, "[SYNC] Starting repository synchronisation");

        let entries = self.source.list_children("").await.map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Failed to list repository root");
            SyncError::RootListing(e)
        })?;

        let mut report = SynchroniseReport::default();
        self.sync_entries(entries, root_page_id, &mut report).await;

        info!(
            directories = report.directories.len(),
            files = report.files.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "[SYNC] Synchronisation finished"
        );
        Ok(report)
    }

    async fn sync_entries(
        &self,
        entries: Vec<TreeEntry>,
        parent_id: &str,
        report: &mut SynchroniseReport,
    ) {
        for entry in entries {
            if let Err(e) = self.sync_entry(&entry, parent_id, report).await {
                error!(path = %entry.path, error = %e, "[SYNC][ERROR] Entry failed, continuing");
                report.fail(&entry.path, &e);
            }
        }
    }

    fn sync_entry<'b>(
        &'b self,
        entry: &'b TreeEntry,
        parent_id: &'b str,
        report: &'b mut SynchroniseReport,
    ) -> BoxFuture<'b, Result<(), SyncError>> {
        async move {
            if self.config.skip_hidden && entry.is_hidden() {
                debug!(path = %entry.path, "Skipping hidden entry");
                report.skip(entry, SkipReason::Hidden);
                return Ok(());
            }
            match entry.kind {
                EntryKind::Dir => self.sync_directory(entry, parent_id, report).await,
                EntryKind::File => self.sync_file(entry, parent_id, report).await,
            }
        }
        .boxed()
    }

    async fn sync_directory(
        &self,
        entry: &TreeEntry,
        parent_id: &str,
        report: &mut SynchroniseReport,
    ) -> Result<(), SyncError> {
        if !self.has_eligible_files(&entry.path).await? {
            info!(path = %entry.path, "Skipping directory without eligible files");
            report.skip(entry, SkipReason::NoEligibleFiles);
            return Ok(());
        }

        let page = self.pages.create_or_get_page(&entry.name, parent_id).await?;
        report.directories.push(SyncedPage {
            path: entry.path.clone(),
            page_id: page.id.clone(),
        });

        let children = self
            .source
            .list_children(&entry.path)
            .await
            .map_err(|e| SyncError::source_at(&entry.path, e))?;
        self.sync_entries(children, &page.id, report).await;
        Ok(())
    }

    async fn sync_file(
        &self,
        entry: &TreeEntry,
        parent_id: &str,
        report: &mut SynchroniseReport,
    ) -> Result<(), SyncError> {
        let extension = entry.extension();
        if !self.config.is_allowed_extension(&extension) {
            debug!(path = %entry.path, extension = %extension, "Skipping file with disallowed extension");
            report.skip(entry, SkipReason::DisallowedExtension);
            return Ok(());
        }
        info!(path = %entry.path, "Syncing file");

        let bytes = self
            .source
            .read_file(&entry.path)
            .await
            .map_err(|e| SyncError::source_at(&entry.path, e))?;
        let raw_content = String::from_utf8_lossy(&bytes).into_owned();
        let summary_text = self.summariser.summarise(&raw_content).await;
        let unit = SyncUnit {
            file_name: entry.name.clone(),
            extension,
            raw_content,
            summary_text,
        };
        let language = self.config.languages.language_for(&unit.extension);

        let page = self.pages.create_or_get_page(&unit.file_name, parent_id).await?;
        self.pages
            .replace_content(&page.id, &unit.summary_text, &unit.raw_content, language)
            .await?;

        report.files.push(SyncedPage {
            path: entry.path.clone(),
            page_id: page.id,
        });
        Ok(())
    }

    /// Whether the subtree at `path` contains at least one file with an allowed extension.
    ///
    /// Short-circuits on the first match. Hidden entries do not count when they are skipped.
    pub fn has_eligible_files<'b>(&'b self, path: &'b str) -> BoxFuture<'b, Result<bool, SyncError>> {
        async move {
            let children = self
                .source
                .list_children(path)
                .await
                .map_err(|e| SyncError::source_at(path, e))?;
            for child in &children {
                if self.config.skip_hidden && child.is_hidden() {
                    continue;
                }
                let eligible = match child.kind {
                    EntryKind::File => self.config.is_allowed_extension(&child.extension()),
                    EntryKind::Dir => self.has_eligible_files(&child.path).await?,
                };
                if eligible {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        .boxed()
    }
}

/// Mirror `source` into the remote page tree rooted at `config.root_page_id`.
pub async fn synchronise<T, S, A>(
    config: &SyncConfig,
    source: &T,
    pages: &PageRepository<S>,
    summariser: &GuardedSummariser<A>,
) -> Result<SynchroniseReport, SyncError>
where
    T: SourceTree,
    S: NoteStore,
    A: Summariser,
{
    if config.root_page_id.trim().is_empty() {
        return Err(SyncError::Config("root page id is empty".to_string()));
    }
    config.trace_loaded();
    Synchroniser::new(source, pages, summariser, config)
        .run()
        .await
}
