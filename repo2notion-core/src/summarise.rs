//! Size ceiling, retry and fallback policy around a [`Summariser`].
//!
//! Model calls are slow and can fail for transient (network, throttling) or
//! permanent (input too large) reasons. [`GuardedSummariser`] never fails: it
//! short-circuits oversized input with a fixed apology, retries the model with
//! exponential backoff, and substitutes a fixed fallback once retries run out.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::contract::Summariser;
use crate::executor::RetryPolicy;

pub const OVERSIZED_INPUT_TEXT: &str =
    "Sorry, no summary was generated: the file exceeds the summariser's input limit.";
pub const FALLBACK_TEXT: &str =
    "Sorry, no summary could be generated. Check the source or try again later.";

static MARKDOWN_FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```markdown\s*").expect("static regex"));
static LEADING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(?:"{3,}|'{3,})"#).expect("static regex"));
static TRAILING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:"{3,}|'{3,})$"#).expect("static regex"));

/// Summariser settings that are not secrets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SummariserConfig {
    /// OpenAI-compatible API root.
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    /// Instruction prepended to the file content. `PROMPT` in the environment overrides it.
    pub prompt: String,
    /// Inputs longer than this (in chars, including the wrapping newlines) are never sent.
    pub max_input_chars: usize,
    pub timeout_secs: u64,
}

impl Default for SummariserConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            model: "qwen-max-latest".to_string(),
            system_prompt: "You are a code documentation assistant.".to_string(),
            prompt: "Write a brief wiki-style summary of this code in markdown:".to_string(),
            max_input_chars: 50_000,
            timeout_secs: 120,
        }
    }
}

/// Strip markdown fences and stray triple quotes that models like to wrap answers in.
pub fn clean_generated_summary(raw: &str) -> String {
    let text = MARKDOWN_FENCE_OPEN.replace_all(raw, "");
    let text = text.replace("```", "");
    let text = LEADING_QUOTES.replace(text.trim(), "");
    let text = TRAILING_QUOTES.replace(text.trim(), "");
    text.trim().to_string()
}

/// Wraps a [`Summariser`] so that a summary string is always produced.
pub struct GuardedSummariser<S> {
    inner: S,
    max_input_chars: usize,
    retry: RetryPolicy,
}

impl<S: Summariser> GuardedSummariser<S> {
    pub fn new(inner: S, max_input_chars: usize, retry: RetryPolicy) -> Self {
        Self {
            inner,
            max_input_chars,
            retry,
        }
    }

    pub async fn summarise(&self, raw: &str) -> String {
        let wrapped = format!("\n{raw}\n");
        let input_chars = wrapped.chars().count();
        if input_chars > self.max_input_chars {
            info!(
                input_chars,
                max_input_chars = self.max_input_chars,
                "Input exceeds summariser ceiling, skipping model call"
            );
            return OVERSIZED_INPUT_TEXT.to_string();
        }

        match self
            .retry
            .run("summarise", || self.inner.summarise(&wrapped))
            .await
        {
            Ok(summary) => clean_generated_summary(&summary),
            Err(e) => {
                warn!(error = %e, "Summariser failed after retries, using fallback text");
                FALLBACK_TEXT.to_string()
            }
        }
    }
}
