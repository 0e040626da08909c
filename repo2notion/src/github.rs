//! [`SourceTree`] over the GitHub contents API.

use async_trait::async_trait;
use base64::Engine as _;
use repo2notion_core::contract::{SourceError, SourceTree, TreeEntry};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Which repository (and optionally which ref) to read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Single(ContentItem),
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    repo: GitHubRepo,
}

impl GitHubClient {
    pub fn new(
        token: &str,
        repo: GitHubRepo,
        base_url: Option<String>,
    ) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("repo2notion"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        tracing::info!(
            owner = %repo.owner,
            repo = %repo.repo,
            reference = ?repo.reference,
            "Initialised GitHub client"
        );
        Ok(Self {
            http,
            base_url,
            repo,
        })
    }

    /// `{base}/repos/{owner}/{repo}/contents/{path}`, each path segment percent-encoded.
    fn contents_url(&self, path: &str) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| format!("base url '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend([
                "repos",
                self.repo.owner.as_str(),
                self.repo.repo.as_str(),
                "contents",
            ])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    async fn contents(&self, path: &str) -> Result<ContentsResponse, SourceError> {
        let url = self.contents_url(path)?;
        let mut request = self.http.get(url.clone());
        if let Some(reference) = &self.repo.reference {
            request = request.query(&[("ref", reference)]);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, url = %url, "GitHub contents request failed");
            return Err(format!("GitHub returned {status} for '{path}': {body}").into());
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SourceTree for GitHubClient {
    async fn list_children(&self, path: &str) -> Result<Vec<TreeEntry>, SourceError> {
        let items = match self.contents(path).await? {
            ContentsResponse::Listing(items) => items,
            ContentsResponse::Single(item) => vec![item],
        };
        let entries = items
            .into_iter()
            .filter_map(|item| match item.kind.as_str() {
                "dir" => Some(TreeEntry::dir(item.name, item.path)),
                "file" => Some(TreeEntry::file(item.name, item.path)),
                other => {
                    tracing::debug!(path = %item.path, kind = other, "Dropping non file/dir entry");
                    None
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(path, count = entries.len(), "Listed GitHub contents");
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let item = match self.contents(path).await? {
            ContentsResponse::Single(item) => item,
            ContentsResponse::Listing(_) => {
                return Err(format!("'{path}' is a directory, not a file").into())
            }
        };

        match (item.content.as_deref(), item.encoding.as_deref()) {
            (Some(content), Some("base64")) if !content.is_empty() => {
                let compact: String = content.split_whitespace().collect();
                Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
            }
            _ => {
                // Large files come back without inline content.
                let url = item
                    .download_url
                    .ok_or_else(|| format!("no content or download_url for '{path}'"))?;
                tracing::debug!(path, url = %url, "Fetching file through download_url");
                let response = self.http.get(&url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}
