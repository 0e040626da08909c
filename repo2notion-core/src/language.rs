//! Extension → code-block language tag.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Tag used for extensions with no mapping.
pub const PLAIN_TEXT: &str = "plain text";

/// Tag used for the summary section.
pub const MARKDOWN: &str = "markdown";

const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("css", "css"),
    ("py", "python"),
    ("sh", "bash"),
    ("yml", "yaml"),
    ("yaml", "yaml"),
    ("md", "markdown"),
    ("html", "html"),
    ("json", "json"),
    ("java", "java"),
    ("cpp", "c++"),
    ("c", "c"),
    ("rb", "ruby"),
    ("php", "php"),
    ("go", "go"),
    ("rs", "rust"),
    ("swift", "swift"),
];

/// Static mapping from lower-cased file extension to the remote store's language tag.
///
/// Entries from the config file are layered over the built-in table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct LanguageMap {
    tags: BTreeMap<String, String>,
}

impl Default for LanguageMap {
    fn default() -> Self {
        Self {
            tags: DEFAULT_MAPPINGS
                .iter()
                .map(|(ext, tag)| (ext.to_string(), tag.to_string()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for LanguageMap {
    fn from(overrides: BTreeMap<String, String>) -> Self {
        let mut map = Self::default();
        for (ext, tag) in overrides {
            map.tags.insert(ext.to_lowercase(), tag);
        }
        map
    }
}

impl LanguageMap {
    pub fn language_for(&self, extension: &str) -> &str {
        self.tags
            .get(&extension.to_lowercase())
            .map(String::as_str)
            .unwrap_or(PLAIN_TEXT)
    }
}
