use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::contract::{EntryKind, SourceError, SourceTree, TreeEntry};

/// A [`SourceTree`] backed by a directory on disk.
///
/// Paths are relative to the root and `/`-separated; `""` is the root itself.
/// Listings are sorted by name so runs are reproducible.
#[derive(Debug, Clone)]
pub struct LocalSourceTree {
    root: PathBuf,
}

impl LocalSourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let mut resolved = self.root.clone();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if part == ".." || part == "." {
                return Err(format!("path '{path}' escapes the source root").into());
            }
            resolved.push(part);
        }
        Ok(resolved)
    }
}

#[async_trait]
impl SourceTree for LocalSourceTree {
    async fn list_children(&self, path: &str) -> Result<Vec<TreeEntry>, SourceError> {
        let dir = self.resolve(path)?;
        let mut reader = fs::read_dir(&dir).await?;
        let mut entries = Vec::new();
        while let Some(item) = reader.next_entry().await? {
            let file_type = item.file_type().await?;
            let kind = if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                tracing::debug!(path = %item.path().display(), "Ignoring non-regular entry");
                continue;
            };
            let name = item.file_name().to_string_lossy().into_owned();
            let child_path = if path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name)
            };
            entries.push(TreeEntry {
                name,
                path: child_path,
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        Ok(fs::read(self.resolve(path)?).await?)
    }
}
