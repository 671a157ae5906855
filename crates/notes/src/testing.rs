//! Shared fixtures for processor tests.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;

use vaultwise_config::AppConfig;
use vaultwise_llm::Summarizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Summarize(String),
    Lookup(String),
    Patterns { system: String, content: String },
}

/// Records every request and answers with canned text.
#[derive(Debug, Default)]
pub struct MockSummarizer {
    pub calls: Mutex<Vec<Call>>,
    pub summary: String,
    pub lookup: String,
    pub patterns: String,
    pub fail: bool,
    pub delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            summary: "Daily digest".to_string(),
            lookup: "A date standard".to_string(),
            patterns: "Pattern summary".to_string(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, call: Call, reply: &str) -> Result<String> {
        self.calls.lock().unwrap().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            bail!("provider unavailable");
        }
        Ok(reply.to_string())
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        self.respond(Call::Summarize(content.to_string()), &self.summary)
            .await
    }

    async fn lookup(&self, query: &str) -> Result<String> {
        self.respond(Call::Lookup(query.to_string()), &self.lookup)
            .await
    }

    async fn summarize_patterns(&self, system_prompt: &str, content: &str) -> Result<String> {
        let call = Call::Patterns {
            system: system_prompt.to_string(),
            content: content.to_string(),
        };
        self.respond(call, &self.patterns).await
    }
}

pub fn config_for(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.vault.root = root.display().to_string();
    config
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
