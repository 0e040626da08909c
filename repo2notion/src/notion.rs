//! # Notion adapter
//!
//! Implements [`NoteStore`] against the public Notion REST API. Each trait call is
//! exactly one HTTP request; rate limiting and retries are applied by the core
//! executor that wraps every call.
//!
//! Content is written as `heading_2` and `code` blocks. Sub-pages are detected in
//! listings through the `child_page` block type.

use async_trait::async_trait;
use repo2notion_core::contract::{ChildBlock, ContentBlock, NoteStore, RemotePage, StoreError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, Deserialize)]
struct BlockList {
    results: Vec<BlockObject>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct BlockObject {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    child_page: Option<ChildPageBody>,
}

#[derive(Debug, Deserialize)]
struct ChildPageBody {
    title: String,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: &str, base_url: Option<String>) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        tracing::info!(base_url = %base_url, "Initialised Notion client");
        Ok(Self { http, base_url })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(%status, what, body = %body, "Notion request failed");
        Err(format!("Notion {what} failed with {status}: {body}").into())
    }
}

fn rich_text(content: &str) -> Value {
    json!({ "type": "text", "text": { "content": content } })
}

/// Notion JSON for one content block.
pub fn block_json(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Heading { text } => json!({
            "object": "block",
            "type": "heading_2",
            "heading_2": { "rich_text": [rich_text(text)] }
        }),
        ContentBlock::Code {
            language,
            rich_text: items,
        } => json!({
            "object": "block",
            "type": "code",
            "code": {
                "rich_text": items.iter().map(|item| rich_text(item)).collect::<Vec<_>>(),
                "language": language
            }
        }),
    }
}

#[async_trait]
impl NoteStore for NotionClient {
    async fn list_children(
        &self,
        block_id: &str,
        page_size: usize,
    ) -> Result<Vec<ChildBlock>, StoreError> {
        let request = self
            .request(Method::GET, &format!("/blocks/{block_id}/children"))
            .query(&[("page_size", page_size)]);
        let list: BlockList = self.send(request, "list children").await?.json().await?;
        if list.has_more {
            tracing::warn!(block_id, page_size, "More children exist than one listing returns");
        }
        Ok(list
            .results
            .into_iter()
            .map(|block| match (block.kind.as_str(), block.child_page) {
                ("child_page", Some(page)) => ChildBlock::child_page(block.id, page.title),
                _ => ChildBlock::other(block.id, block.kind),
            })
            .collect())
    }

    async fn create_page(&self, title: &str, parent_id: &str) -> Result<RemotePage, StoreError> {
        let body = json!({
            "parent": { "page_id": parent_id },
            "properties": {
                "title": { "title": [rich_text(title)] }
            }
        });
        let request = self.request(Method::POST, "/pages").json(&body);
        let created: CreatedPage = self.send(request, "create page").await?.json().await?;
        Ok(RemotePage {
            id: created.id,
            title: title.to_string(),
            parent_id: parent_id.to_string(),
        })
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), StoreError> {
        let request = self.request(Method::DELETE, &format!("/blocks/{block_id}"));
        self.send(request, "delete block").await?;
        Ok(())
    }

    async fn append_blocks(
        &self,
        block_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), StoreError> {
        let body = json!({ "children": blocks.iter().map(block_json).collect::<Vec<_>>() });
        let request = self
            .request(Method::PATCH, &format!("/blocks/{block_id}/children"))
            .json(&body);
        self.send(request, "append blocks").await?;
        Ok(())
    }
}
