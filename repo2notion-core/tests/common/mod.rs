#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use repo2notion_core::config::SyncConfig;
use repo2notion_core::contract::{
    ChildBlock, ContentBlock, NoteStore, RemotePage, SourceError, SourceTree, StoreError,
    Summariser, SummaryError, TreeEntry,
};
use repo2notion_core::executor::{RateLimitedExecutor, RetryPolicy};
use repo2notion_core::local::LocalSourceTree;
use repo2notion_core::repository::{PageRepository, SectionHeadings};
use repo2notion_core::summarise::GuardedSummariser;

pub const ROOT_PAGE: &str = "root-page";
pub const SUMMARY: &str = "A short summary.";

#[derive(Debug, Clone)]
enum Node {
    Page { id: String, title: String },
    Block { id: String, block: ContentBlock },
}

impl Node {
    fn id(&self) -> &str {
        match self {
            Node::Page { id, .. } | Node::Block { id, .. } => id,
        }
    }
}

#[derive(Default)]
struct StoreState {
    children: HashMap<String, Vec<Node>>,
    append_sizes: Vec<usize>,
    failing_titles: HashSet<String>,
}

/// A page tree held in memory, standing in for the remote store.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Every `create_page` for `title` fails.
    pub fn fail_create(&self, title: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_titles
            .insert(title.to_string());
    }

    /// `(id, title)` of the sub-pages of `parent_id`, in creation order.
    pub fn pages_under(&self, parent_id: &str) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        state
            .children
            .get(parent_id)
            .into_iter()
            .flatten()
            .filter_map(|node| match node {
                Node::Page { id, title } => Some((id.clone(), title.clone())),
                Node::Block { .. } => None,
            })
            .collect()
    }

    pub fn blocks_of(&self, page_id: &str) -> Vec<ContentBlock> {
        let state = self.state.lock().unwrap();
        state
            .children
            .get(page_id)
            .into_iter()
            .flatten()
            .filter_map(|node| match node {
                Node::Block { block, .. } => Some(block.clone()),
                Node::Page { .. } => None,
            })
            .collect()
    }

    pub fn append_request_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().append_sizes.clone()
    }

    /// Title path and content of every page below `parent_id`, depth-first.
    pub fn dump(&self, parent_id: &str) -> Vec<(String, Vec<ContentBlock>)> {
        let mut out = Vec::new();
        self.dump_into(parent_id, "", &mut out);
        out
    }

    fn dump_into(&self, parent_id: &str, prefix: &str, out: &mut Vec<(String, Vec<ContentBlock>)>) {
        for (id, title) in self.pages_under(parent_id) {
            let path = format!("{prefix}{title}");
            out.push((path.clone(), self.blocks_of(&id)));
            self.dump_into(&id, &format!("{path}/"), out);
        }
    }
}

#[async_trait]
impl NoteStore for InMemoryStore {
    async fn list_children(
        &self,
        block_id: &str,
        page_size: usize,
    ) -> Result<Vec<ChildBlock>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .children
            .get(block_id)
            .into_iter()
            .flatten()
            .take(page_size)
            .map(|node| match node {
                Node::Page { id, title } => ChildBlock::child_page(id.clone(), title.clone()),
                Node::Block { id, block } => {
                    let block_type = match block {
                        ContentBlock::Heading { .. } => "heading_2",
                        ContentBlock::Code { .. } => "code",
                    };
                    ChildBlock::other(id.clone(), block_type)
                }
            })
            .collect())
    }

    async fn create_page(&self, title: &str, parent_id: &str) -> Result<RemotePage, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_titles.contains(title) {
            return Err(format!("rejected page '{title}'").into());
        }
        let id = uuid::Uuid::new_v4().to_string();
        state
            .children
            .entry(parent_id.to_string())
            .or_default()
            .push(Node::Page {
                id: id.clone(),
                title: title.to_string(),
            });
        Ok(RemotePage {
            id,
            title: title.to_string(),
            parent_id: parent_id.to_string(),
        })
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        for nodes in state.children.values_mut() {
            if let Some(index) = nodes.iter().position(|n| n.id() == block_id) {
                nodes.remove(index);
                return Ok(());
            }
        }
        Err(format!("no block {block_id}").into())
    }

    async fn append_blocks(
        &self,
        block_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.append_sizes.push(blocks.len());
        let nodes = state.children.entry(block_id.to_string()).or_default();
        for block in blocks {
            nodes.push(Node::Block {
                id: uuid::Uuid::new_v4().to_string(),
                block: block.clone(),
            });
        }
        Ok(())
    }
}

/// A local tree whose listed paths can be made unreadable.
pub struct FlakySource {
    pub inner: LocalSourceTree,
    pub unreadable: HashSet<String>,
}

#[async_trait]
impl SourceTree for FlakySource {
    async fn list_children(&self, path: &str) -> Result<Vec<TreeEntry>, SourceError> {
        self.inner.list_children(path).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        if self.unreadable.contains(path) {
            return Err(format!("permission denied: {path}").into());
        }
        self.inner.read_file(path).await
    }
}

pub struct FixedSummariser;

#[async_trait]
impl Summariser for FixedSummariser {
    async fn summarise(&self, _raw: &str) -> Result<String, SummaryError> {
        Ok(SUMMARY.to_string())
    }
}

pub fn sync_config() -> SyncConfig {
    SyncConfig {
        root_page_id: ROOT_PAGE.to_string(),
        ..SyncConfig::default()
    }
}

pub fn repository(config: &SyncConfig) -> PageRepository<InMemoryStore> {
    let executor = Arc::new(RateLimitedExecutor::new(
        5,
        Duration::ZERO,
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        },
    ));
    PageRepository::new(
        InMemoryStore::default(),
        executor,
        config.limits,
        SectionHeadings::from(config),
    )
}

pub fn summariser() -> GuardedSummariser<FixedSummariser> {
    GuardedSummariser::new(
        FixedSummariser,
        50_000,
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        },
    )
}

/// Create `files` (relative path, content) below `root`, with parent directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }
}
