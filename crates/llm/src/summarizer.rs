//! The summarization contract the vault processors depend on.

use anyhow::Result;
use async_trait::async_trait;

use vaultwise_config::{AppConfig, PromptConfig};

use crate::{LlmRouter, Provider};

/// Text generation used by the daily, weekly and backlog runs.
///
/// Every call is a single request/response; implementations must not retry
/// and must surface failures as errors.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// General daily summary using the configured daily prompt.
    async fn summarize(&self, content: &str) -> Result<String>;

    /// Expand or explain a single `#lookup` query.
    async fn lookup(&self, query: &str) -> Result<String>;

    /// Generic completion with a caller-supplied system prompt.
    async fn summarize_patterns(&self, system_prompt: &str, content: &str) -> Result<String>;
}

/// [`Summarizer`] backed by the configured LLM provider.
#[derive(Debug, Clone)]
pub struct LlmSummarizer {
    router: LlmRouter,
    provider: Provider,
    model: String,
    prompts: PromptConfig,
}

impl LlmSummarizer {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            router: LlmRouter::from_config(&config.llm)?,
            provider: Provider::from_config(&config.llm),
            model: config.active_model().to_string(),
            prompts: config.prompts.clone(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        self.router
            .chat(self.provider, &self.model, &self.prompts.daily, content)
            .await
    }

    async fn lookup(&self, query: &str) -> Result<String> {
        self.router
            .chat(self.provider, &self.model, &self.prompts.lookup, query)
            .await
    }

    async fn summarize_patterns(&self, system_prompt: &str, content: &str) -> Result<String> {
        self.router
            .chat(self.provider, &self.model, system_prompt, content)
            .await
    }
}
