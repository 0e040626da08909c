/// `load_config` module: loads the static YAML config and injects secrets from the environment.
///
/// This module is the only place where untrusted YAML is parsed and mapped to the
/// strongly-typed settings of the core crate.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`CliConfig`]
/// - Read secrets (`NOTION_TOKEN`, `GITHUB_TOKEN`, `DASHSCOPE_API_KEY`) from the environment only
/// - Resolve the root page id (`notion.root_page_id`, else `NOTION_ROOT_PAGE_ID`)
/// - Apply the `PROMPT` override to the summariser prompt
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, bail, Context, Result};
use repo2notion_core::config::{SyncConfig, MAX_PAGE_SIZE};
use repo2notion_core::download::GitSource;
use repo2notion_core::executor::{ExecutorConfig, MAX_ATTEMPTS};
use repo2notion_core::summarise::SummariserConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::github::GitHubRepo;

/// Where the repository to mirror comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSection {
    /// Read through the GitHub contents API.
    Github(GitHubRepo),
    /// An already checked-out directory.
    Local { path: PathBuf },
    /// Cloned with `git` into a temporary directory first.
    Git(GitSource),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotionSection {
    #[serde(default)]
    pub root_page_id: Option<String>,
    /// Overrides the public API root.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Secrets, taken from the environment and never from the YAML file.
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    pub notion_token: String,
    pub github_token: Option<String>,
    pub dashscope_api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("notion_token", &"<redacted>")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("dashscope_api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub source: SourceSection,
    pub notion_base_url: Option<String>,
    /// `root_page_id` is always resolved and non-empty.
    pub sync: SyncConfig,
    pub executor: ExecutorConfig,
    pub summariser: SummariserConfig,
    pub secrets: Secrets,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    source: SourceSection,
    #[serde(default)]
    notion: NotionSection,
    #[serde(default)]
    sync: SyncConfig,
    #[serde(default)]
    executor: ExecutorConfig,
    #[serde(default)]
    summariser: SummariserConfig,
}

fn required_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            error!(variable = name, "Required environment variable missing");
            Err(anyhow!("environment variable {name} must be set"))
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Loads a static YAML config file (no secrets) and injects required env vars for secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let raw: RawConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");

    let root_page_id = raw
        .notion
        .root_page_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| optional_env("NOTION_ROOT_PAGE_ID"))
        .context("no root page id: set notion.root_page_id or NOTION_ROOT_PAGE_ID")?;

    let github_token = match raw.source {
        SourceSection::Github(_) => Some(required_env("GITHUB_TOKEN")?),
        _ => optional_env("GITHUB_TOKEN"),
    };
    let secrets = Secrets {
        notion_token: required_env("NOTION_TOKEN")?,
        github_token,
        dashscope_api_key: required_env("DASHSCOPE_API_KEY")?,
    };

    let mut summariser = raw.summariser;
    if let Some(prompt) = optional_env("PROMPT") {
        summariser.prompt = prompt;
    }
    if summariser.max_input_chars == 0 {
        bail!("summariser.max_input_chars must be positive");
    }
    let page_size = raw.sync.limits.page_size;
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        bail!("sync.limits.page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}");
    }
    if raw.executor.max_attempts > MAX_ATTEMPTS {
        bail!(
            "executor.max_attempts must be at most {MAX_ATTEMPTS}, got {}",
            raw.executor.max_attempts
        );
    }

    let sync = SyncConfig {
        root_page_id,
        ..raw.sync
    };

    Ok(CliConfig {
        source: raw.source,
        notion_base_url: raw.notion.base_url,
        sync,
        executor: raw.executor,
        summariser,
        secrets,
    })
}
