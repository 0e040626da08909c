use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::{debug, info};

use crate::language::LanguageMap;

/// Most children the remote returns from one listing call.
pub const MAX_PAGE_SIZE: usize = 100;

/// Hard ceilings of the remote content model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContentLimits {
    /// UTF-16 code units per rich-text segment (the remote allows 2000; keep a margin).
    pub max_segment_len: usize,
    /// Rich-text items per block.
    pub max_items_per_block: usize,
    /// Blocks per append request.
    pub max_blocks_per_request: usize,
    /// Children requested per listing call, at most [`MAX_PAGE_SIZE`]. Listings are never paginated further.
    pub page_size: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_segment_len: 1990,
            max_items_per_block: 100,
            max_blocks_per_request: 50,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// What to mirror and how pages are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote page under which the repository root is mirrored. Usually injected from the environment.
    pub root_page_id: String,
    /// Lower-cased extensions that are mirrored; everything else is skipped.
    #[serde(deserialize_with = "lowercase_set")]
    pub allowed_extensions: BTreeSet<String>,
    /// Skip entries whose name starts with `.`.
    pub skip_hidden: bool,
    pub summary_heading: String,
    pub source_heading: String,
    pub languages: LanguageMap,
    pub limits: ContentLimits,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_page_id: String::new(),
            allowed_extensions: ["js", "ts", "py", "sh"]
                .into_iter()
                .map(String::from)
                .collect(),
            skip_hidden: true,
            summary_heading: "Summary".to_string(),
            source_heading: "Source".to_string(),
            languages: LanguageMap::default(),
            limits: ContentLimits::default(),
        }
    }
}

impl SyncConfig {
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.contains(&extension.to_lowercase())
    }

    pub fn trace_loaded(&self) {
        info!(
            root_page_id = %self.root_page_id,
            allowed_extensions = ?self.allowed_extensions,
            skip_hidden = self.skip_hidden,
            "Loaded sync config"
        );
        debug!(?self, "Sync config loaded (full debug)");
    }
}

fn lowercase_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect())
}
