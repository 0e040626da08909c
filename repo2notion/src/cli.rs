//! # repo2notion CLI interface
//!
//! Command parsing and orchestration only: the adapters in this crate are wired into
//! the core pipeline here, and all synchronisation logic lives in `repo2notion-core`.
//!
//! - For command-line users: run the `repo2notion` binary with `--help`.
//! - For programmatic and integration use: call [`run`] with a constructed [`Cli`].
use crate::chat::ChatSummariser;
use crate::github::GitHubClient;
use crate::load_config::{load_config, CliConfig, SourceSection};
use crate::notion::NotionClient;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use repo2notion_core::contract::SourceTree;
use repo2notion_core::download::clone_repository;
use repo2notion_core::executor::RateLimitedExecutor;
use repo2notion_core::local::LocalSourceTree;
use repo2notion_core::repository::{PageRepository, SectionHeadings};
use repo2notion_core::summarise::GuardedSummariser;
use repo2notion_core::synchronise::{synchronise, SynchroniseReport};
use std::path::PathBuf;
use std::sync::Arc;

/// Mirror a source repository into a Notion page tree with AI summaries.
#[derive(Parser)]
#[clap(
    name = "repo2notion",
    version,
    about = "Mirror a source repository into a Notion page tree with AI summaries"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronise the configured repository into the configured root page
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "sync", "Starting synchronisation process");
            let report = sync_source(&config).await.map_err(|e| {
                tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                e
            })?;
            if !report.is_clean() {
                tracing::warn!(
                    command = "sync",
                    failures = report.failures.len(),
                    "Synchronisation finished with failed entries"
                );
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            tracing::info!(command = "sync", "Synchronisation complete");
            Ok(())
        }
    }
}

async fn sync_source(config: &CliConfig) -> Result<SynchroniseReport> {
    match &config.source {
        SourceSection::Github(repo) => {
            let token = config
                .secrets
                .github_token
                .as_deref()
                .context("GITHUB_TOKEN is required for github sources")?;
            let source = GitHubClient::new(token, repo.clone(), None)
                .map_err(|e| anyhow!("building GitHub client: {e}"))?;
            sync_with(config, &source).await
        }
        SourceSection::Local { path } => sync_with(config, &LocalSourceTree::new(path)).await,
        SourceSection::Git(git) => {
            let workdir = tempfile::tempdir().context("creating clone directory")?;
            let checkout = clone_repository(git, workdir.path()).await?;
            sync_with(config, &LocalSourceTree::new(checkout)).await
        }
    }
}

async fn sync_with<T: SourceTree>(config: &CliConfig, source: &T) -> Result<SynchroniseReport> {
    let notion = NotionClient::new(&config.secrets.notion_token, config.notion_base_url.clone())
        .map_err(|e| anyhow!("building Notion client: {e}"))?;
    let executor = Arc::new(RateLimitedExecutor::from_config(&config.executor));
    let pages = PageRepository::new(
        notion,
        executor,
        config.sync.limits,
        SectionHeadings::from(&config.sync),
    );

    let chat = ChatSummariser::new(
        config.secrets.dashscope_api_key.clone(),
        config.summariser.clone(),
    )
    .map_err(|e| anyhow!("building summariser: {e}"))?;
    let summariser = GuardedSummariser::new(
        chat,
        config.summariser.max_input_chars,
        config.executor.retry_policy(),
    );

    Ok(synchronise(&config.sync, source, &pages, &summariser).await?)
}
