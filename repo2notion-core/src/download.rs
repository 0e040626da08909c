//! Fetch a git repository into a local directory so it can be mirrored with
//! [`LocalSourceTree`](crate::local::LocalSourceTree).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tokio::process::Command;

use crate::error::SyncError;

/// A git repository to clone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitSource {
    pub repo_url: String,
    /// Branch, tag or commit to check out. The remote's default branch when absent.
    #[serde(default)]
    pub reference: Option<String>,
}

impl GitSource {
    /// Directory name for this source, derived from the url and reference only.
    ///
    /// ```
    /// use repo2notion_core::download::GitSource;
    /// let source = GitSource {
    ///     repo_url: "https://github.com/octocat/hello-world".into(),
    ///     reference: Some("main".into()),
    /// };
    /// assert_eq!(source.dir_name(), "git_https___github.com_octocat_hello-world_main");
    /// ```
    pub fn dir_name(&self) -> String {
        let reference = self.reference.as_deref().unwrap_or("HEAD");
        format!("git_{}_{}", self.repo_url, reference)
            .replace('/', "_")
            .replace(':', "_")
    }
}

/// Clone `source` into `out_dir/<dir_name>`, replacing any earlier clone, and
/// check out the requested reference. Returns the checkout path.
pub async fn clone_repository(source: &GitSource, out_dir: &Path) -> Result<PathBuf, SyncError> {
    let target = out_dir.join(source.dir_name());

    if fs::try_exists(&target).await.unwrap_or(false) {
        fs::remove_dir_all(&target).await.map_err(|e| {
            tracing::error!(error = ?e, path = %target.display(), "Failed to remove previous clone");
            SyncError::Download(format!("cannot remove {}: {e}", target.display()))
        })?;
        tracing::debug!(path = %target.display(), "Removed previous clone");
    }
    fs::create_dir_all(out_dir).await.map_err(|e| {
        tracing::error!(error = ?e, path = %out_dir.display(), "Failed to create output directory");
        SyncError::Download(format!("cannot create {}: {e}", out_dir.display()))
    })?;

    run_git(
        Command::new("git")
            .arg("clone")
            .arg(&source.repo_url)
            .arg(&target),
        "clone",
    )
    .await?;
    tracing::info!(
        repo_url = %source.repo_url,
        path = %target.display(),
        "Cloned git repository"
    );

    if let Some(reference) = source.reference.as_deref() {
        run_git(
            Command::new("git")
                .arg("-C")
                .arg(&target)
                .arg("checkout")
                .arg(reference),
            "checkout",
        )
        .await?;
        tracing::info!(reference, path = %target.display(), "Checked out git reference");
    }

    Ok(target)
}

async fn run_git(command: &mut Command, step: &str) -> Result<(), SyncError> {
    let output = command.output().await.map_err(|e| {
        tracing::error!(error = ?e, step, "Failed to launch git");
        SyncError::Download(format!("failed to launch git {step}: {e}"))
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(step, status = ?output.status, stderr = %stderr.trim(), "Git exited with non-zero code");
        return Err(SyncError::Download(format!(
            "git {step} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
