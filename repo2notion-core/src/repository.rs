//! # repository: title/parent addressed pages on top of a [`NoteStore`]
//!
//! [`PageRepository`] maps `(title, parent_id)` to a remote page and owns the
//! clear-then-append content replacement. Every remote call goes through the
//! shared [`RateLimitedExecutor`].
//!
//! ## Known limitations
//! - Listings only look at the first `page_size` children. A parent with more
//!   children than that can hide an existing page from [`PageRepository::find_page`]
//!   (yielding a duplicate on create) and leave blocks behind in
//!   [`PageRepository::clear_content`].
//! - `create_or_get_page` is find-then-create, two separate remote calls. Two
//!   concurrent callers syncing the same title under the same parent can both
//!   miss the find and both create. The single traversal thread avoids this in
//!   practice; re-running the sync is the repair path.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chunk::{batches, pack, sanitize, split_text, BreakStyle};
use crate::config::{ContentLimits, SyncConfig};
use crate::contract::{ChildBlock, ChildKind, ContentBlock, NoteStore, RemotePage, StoreError};
use crate::error::SyncError;
use crate::executor::RateLimitedExecutor;
use crate::language::MARKDOWN;

/// Headings for the two sections written to every file page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeadings {
    pub summary: String,
    pub source: String,
}

impl Default for SectionHeadings {
    fn default() -> Self {
        Self {
            summary: "Summary".to_string(),
            source: "Source".to_string(),
        }
    }
}

impl From<&SyncConfig> for SectionHeadings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            summary: config.summary_heading.clone(),
            source: config.source_heading.clone(),
        }
    }
}

pub struct PageRepository<S> {
    store: S,
    executor: Arc<RateLimitedExecutor>,
    limits: ContentLimits,
    headings: SectionHeadings,
}

impl<S: NoteStore> PageRepository<S> {
    pub fn new(
        store: S,
        executor: Arc<RateLimitedExecutor>,
        limits: ContentLimits,
        headings: SectionHeadings,
    ) -> Self {
        Self {
            store,
            executor,
            limits,
            headings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn list_children(&self, block_id: &str) -> Result<Vec<ChildBlock>, StoreError> {
        let page_size = self.limits.page_size;
        let children = self
            .executor
            .schedule("list_children", || {
                self.store.list_children(block_id, page_size)
            })
            .await?;
        if children.len() >= page_size {
            warn!(
                block_id,
                page_size, "Listing hit the page-size ceiling; later children are not inspected"
            );
        }
        Ok(children)
    }

    /// Find a sub-page titled `title` among the first page of `parent_id`'s children.
    pub async fn find_page(
        &self,
        title: &str,
        parent_id: &str,
    ) -> Result<Option<RemotePage>, SyncError> {
        let children = self
            .list_children(parent_id)
            .await
            .map_err(|e| SyncError::store(format!("listing children of {parent_id}"), e))?;

        let found = children.into_iter().find_map(|child| match child.kind {
            ChildKind::ChildPage { title: t } if t == title => Some(RemotePage {
                id: child.id,
                title: t,
                parent_id: parent_id.to_string(),
            }),
            _ => None,
        });
        debug!(title, parent_id, found = found.is_some(), "Searched for page");
        Ok(found)
    }

    /// Return the page titled `title` under `parent_id`, creating it when absent.
    ///
    /// Not atomic: see the module docs.
    pub async fn create_or_get_page(
        &self,
        title: &str,
        parent_id: &str,
    ) -> Result<RemotePage, SyncError> {
        if let Some(page) = self.find_page(title, parent_id).await? {
            info!(page_id = %page.id, title, "Found existing page");
            return Ok(page);
        }

        let page = self
            .executor
            .schedule("create_page", || self.store.create_page(title, parent_id))
            .await
            .map_err(|e| {
                error!(error = %e, title, parent_id, "Failed to create page");
                SyncError::store(format!("creating page '{title}'"), e)
            })?;
        info!(page_id = %page.id, title, parent_id, "Created page");
        Ok(page)
    }

    /// Delete every non-sub-page block among the first page of `page_id`'s children.
    ///
    /// A failed delete is logged and skipped; only a failed listing is an error.
    pub async fn clear_content(&self, page_id: &str) -> Result<(), SyncError> {
        let children = self
            .list_children(page_id)
            .await
            .map_err(|e| SyncError::store(format!("listing blocks of {page_id}"), e))?;

        let mut deleted = 0usize;
        for child in children.iter().filter(|c| !c.is_child_page()) {
            match self
                .executor
                .schedule("delete_block", || self.store.delete_block(&child.id))
                .await
            {
                Ok(()) => {
                    deleted += 1;
                    debug!(block_id = %child.id, "Deleted block");
                }
                Err(e) => {
                    error!(error = %e, block_id = %child.id, page_id, "Failed to delete block, continuing");
                }
            }
        }
        info!(page_id, deleted, "Cleared page content");
        Ok(())
    }

    /// Build the full ordered block list for a file page: summary section, then source section.
    pub fn build_blocks(&self, summary: &str, raw: &str, language: &str) -> Vec<ContentBlock> {
        let mut blocks = self.section(&self.headings.summary, MARKDOWN, summary);
        blocks.extend(self.section(&self.headings.source, language, raw));
        blocks
    }

    fn section(&self, heading: &str, language: &str, text: &str) -> Vec<ContentBlock> {
        let segments = split_text(&sanitize(text), self.limits.max_segment_len, BreakStyle::Line);
        std::iter::once(ContentBlock::Heading {
            text: heading.to_string(),
        })
        .chain(
            pack(segments, self.limits.max_items_per_block)
                .into_iter()
                .map(|rich_text| ContentBlock::Code {
                    language: language.to_string(),
                    rich_text,
                }),
        )
        .collect()
    }

    /// Append `blocks` in order, at most `max_blocks_per_request` per call, one call at a time.
    pub async fn append_blocks(
        &self,
        page_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), SyncError> {
        let per_request = self.limits.max_blocks_per_request;
        for (index, batch) in batches(blocks, per_request).enumerate() {
            let first = index * per_request + 1;
            debug!(page_id, first, last = first + batch.len() - 1, "Appending blocks");
            self.executor
                .schedule("append_blocks", || self.store.append_blocks(page_id, batch))
                .await
                .map_err(|e| SyncError::store(format!("appending blocks to {page_id}"), e))?;
        }
        Ok(())
    }

    /// Replace a file page's content with the summary and source sections.
    ///
    /// Clear strictly precedes append. Any failure restarts the whole replacement
    /// from the clear step, up to the executor's attempt limit.
    pub async fn replace_content(
        &self,
        page_id: &str,
        summary: &str,
        raw: &str,
        language: &str,
    ) -> Result<(), SyncError> {
        let blocks = self.build_blocks(summary, raw, language);
        self.executor
            .retry_policy()
            .run("replace_content", || async {
                self.clear_content(page_id).await?;
                self.append_blocks(page_id, &blocks).await
            })
            .await?;
        info!(page_id, blocks = blocks.len(), "Replaced page content");
        Ok(())
    }
}
