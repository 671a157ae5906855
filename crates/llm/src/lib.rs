mod summarizer;

pub use summarizer::{LlmSummarizer, Summarizer};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use vaultwise_config::LlmConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenRouter,
}

impl Provider {
    pub fn from_config(config: &LlmConfig) -> Self {
        if config.provider.eq_ignore_ascii_case("ollama") {
            Provider::Ollama
        } else {
            Provider::OpenRouter
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

impl OpenRouterClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

/// Routes a system + user prompt pair to the configured provider.
#[derive(Debug, Clone)]
pub struct LlmRouter {
    ollama: OllamaClient,
    openrouter: OpenRouterClient,
}

impl LlmRouter {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        Ok(Self {
            ollama: OllamaClient::new(&config.ollama_base_url, timeout)?,
            openrouter: OpenRouterClient::new(&config.openrouter_base_url, timeout)?,
        })
    }

    /// One non-streaming completion.  Transport failures, non-2xx statuses and
    /// empty replies are all errors; nothing is retried.
    pub async fn chat(
        &self,
        provider: Provider,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String> {
        debug!(?provider, model, user_chars = user.len(), "llm request");
        let reply = match provider {
            Provider::Ollama => self.ollama.chat_model(model, system, user).await?,
            Provider::OpenRouter => self.openrouter.chat_model(model, system, user).await?,
        };
        debug!(?provider, reply_chars = reply.len(), "llm response");
        Ok(reply)
    }
}

const OPENROUTER_FALLBACK_MODELS: &[&str] = &[
    "openai/gpt-4o-mini",
    "openai/gpt-4.1-mini",
    "anthropic/claude-3.5-sonnet",
    "anthropic/claude-3.7-sonnet",
    "google/gemini-2.0-flash-001",
    "meta-llama/llama-3.1-70b-instruct",
    "deepseek/deepseek-chat",
];

pub async fn list_ollama_models() -> Result<Vec<String>> {
    let output = match Command::new("ollama").arg("list").output().await {
        Ok(output) => output,
        Err(_) => bail!("ollama not found in PATH"),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        bail!("failed to read ollama models: {stderr}");
    }

    Ok(parse_ollama_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Model names from `ollama list` output (first column, header skipped).
fn parse_ollama_list(stdout: &str) -> Vec<String> {
    let mut models = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    models.sort();
    models.dedup();
    models
}

pub async fn list_openrouter_models(base_url: &str) -> Result<Vec<String>> {
    let client = http_client(Duration::from_secs(6))?;
    let endpoint = format!("{}/models", base_url.trim_end_matches('/'));
    let response = client.get(endpoint).send().await;

    let models = match response {
        Ok(response) if response.status().is_success() => {
            let body: serde_json::Value = response.json().await?;
            let mut items = body
                .get("data")
                .and_then(|data| data.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get("id").and_then(|id| id.as_str()))
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            items.sort();
            items.dedup();
            if items.is_empty() {
                fallback_models()
            } else {
                items
            }
        }
        _ => fallback_models(),
    };

    Ok(models)
}

fn fallback_models() -> Vec<String> {
    OPENROUTER_FALLBACK_MODELS
        .iter()
        .map(|model| (*model).to_string())
        .collect()
}

impl OllamaClient {
    async fn chat_model(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let endpoint = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        let payload = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "stream": false
        });

        let response = match self.client.post(endpoint).json(&payload).send().await {
            Ok(response) => response,
            Err(error) => bail!(
                "Ollama unavailable at {}. Start Ollama and ensure model '{model}' is installed. Error: {error}",
                self.base_url
            ),
        };

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            bail!("Ollama error ({status}): {raw}");
        }
        let body: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Ollama returned invalid JSON: {raw}"))?;

        parse_ollama_reply(&body)
    }
}

impl OpenRouterClient {
    async fn chat_model(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            bail!("OPENROUTER_API_KEY is not set; export it or switch llm.provider to \"ollama\"");
        }

        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ]
        });

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key.trim())
            .header("HTTP-Referer", "https://vaultwise.local")
            .header("X-Title", "vaultwise")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            bail!("OpenRouter error ({status}): {raw}");
        }
        let body: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("OpenRouter returned invalid JSON: {raw}"))?;

        parse_openrouter_reply(&body)
    }
}

fn parse_ollama_reply(body: &serde_json::Value) -> Result<String> {
    match body
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
    {
        Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
        _ => bail!("Ollama response missing text: {body}"),
    }
}

fn parse_openrouter_reply(body: &serde_json::Value) -> Result<String> {
    match body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
    {
        Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
        _ => bail!("OpenRouter response missing text: {body}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
