// Course description summarizers.
//
// The default implementation calls an OpenAI-compatible chat completions
// endpoint. Reasoning models wrap their chain of thought in <think> tags,
// which is stripped before the summary is stored. `ExcerptSummarizer` is the
// offline fallback: it keeps the opening of the description itself.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use crate::output::truncate_chars;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think pattern"));

/// Local models can take a while on long descriptions.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes academic course descriptions. \
Your task is to read and analyze a course description provided in markdown format. \
From this content, extract and summarize the core learning objectives and the key skills students will develop. \
Also highlight the relevant technologies or domains the course focuses on. \
Return a short, clear summary (2-3 sentences) suitable for students evaluating the course.";

/// Turns a course description into a short summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<String>;
}

/// Remove `<think>...</think>` blocks and surrounding whitespace.
pub fn clean_summary_output(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Summarizer backed by a chat completions API.
pub struct ChatSummarizer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    rate_limiter: RateLimiter,
}

impl ChatSummarizer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        rate_limiter: RateLimiter,
    ) -> Result<Self> {
        Self::with_timeout(api_url, api_key, model, rate_limiter, REQUEST_TIMEOUT)
    }

    /// Like `new`, with a custom per-request timeout.
    pub fn with_timeout(
        api_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        rate_limiter: RateLimiter,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("trendcover/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            rate_limiter,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        self.rate_limiter.acquire().await;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        };

        let mut builder = self.client.post(&self.api_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to call chat completions endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat endpoint returned {}: {}", status, truncate_chars(&body, 200));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        let raw = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Chat response has no choices")?;

        let summary = clean_summary_output(&raw);
        if summary.is_empty() {
            anyhow::bail!("Chat response was empty after cleanup");
        }

        debug!(
            model = %self.model,
            input_chars = content.chars().count(),
            summary_preview = %truncate_chars(&summary, 60),
            "Summarized description"
        );
        Ok(summary)
    }
}

/// Offline summarizer: the first `max_chars` characters of the description,
/// flattened onto one line.
pub struct ExcerptSummarizer {
    pub max_chars: usize,
}

impl Default for ExcerptSummarizer {
    fn default() -> Self {
        Self { max_chars: 600 }
    }
}

#[async_trait]
impl Summarizer for ExcerptSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.is_empty() {
            anyhow::bail!("Nothing to summarize");
        }
        Ok(truncate_chars(&flat, self.max_chars))
    }
}

// --- Chat completions request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_summary_strips_think_blocks() {
        let raw = "<think>\nThe user wants...\n</think>\n\n  Students learn vision.  ";
        assert_eq!(clean_summary_output(raw), "Students learn vision.");
    }

    #[test]
    fn test_clean_summary_multiple_blocks() {
        assert_eq!(clean_summary_output("<think>a</think>One <think>b</think>two"), "One two");
        assert_eq!(clean_summary_output("plain"), "plain");
        assert_eq!(clean_summary_output("<think>only</think>"), "");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Summary."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Summary.");
    }

    #[tokio::test]
    async fn test_excerpt_summarizer() {
        let s = ExcerptSummarizer { max_chars: 200 };
        let out = s.summarize("Line one\n\nLine   two").await.unwrap();
        assert_eq!(out, "Line one Line two");
        assert!(s.summarize("   \n").await.is_err());
    }

    #[tokio::test]
    async fn test_stalled_endpoint_times_out() {
        // Accepts the connection and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let summarizer = ChatSummarizer::with_timeout(
            format!("http://{addr}/v1/chat/completions"),
            None,
            "test-model",
            RateLimiter::per_minute(0),
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(summarizer.model(), "test-model");

        let result = tokio::time::timeout(Duration::from_secs(10), summarizer.summarize("text"))
            .await
            .expect("request should give up on its own");
        assert!(result.is_err());
        server.abort();
    }
}
