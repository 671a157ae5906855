use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

// ── Vault layout ─────────────────────────────────────────────────────────────

/// Where the inbox, archive and focus files live inside the vault.
///
/// Every path except `root` is relative to `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault root directory.  Overridden by `VAULTWISE_VAULT_ROOT` when set.
    pub root: String,
    /// The inbox file processed by the daily run.
    pub input_file: String,
    /// Directory holding `<year>/Week_<ww>/<archive_prefix><date>.md`.
    pub archive_path: String,
    pub archive_prefix: String,
    /// Directory holding `<year>/<focus_prefix><ww>.md` and the weekly summary.
    pub focus_path: String,
    pub focus_prefix: String,
    /// Lines starting with this marker stay in the inbox untouched.
    pub ignore_prefix: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            input_file: "Inbox.md".to_string(),
            archive_path: "Archive".to_string(),
            archive_prefix: "Daily_".to_string(),
            focus_path: "Focus".to_string(),
            focus_prefix: "Week_".to_string(),
            ignore_prefix: "@ignore".to_string(),
        }
    }
}

impl VaultConfig {
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }
}

// ── Schedule ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Day on which the weekly digest and the backlog review run.
    /// Accepts full or abbreviated English names (`"monday"`, `"Mon"`).
    pub weekly_day: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekly_day: "monday".to_string(),
        }
    }
}

impl ScheduleConfig {
    pub fn weekday(&self) -> Result<Weekday> {
        match self.weekly_day.trim().parse::<Weekday>() {
            Ok(day) => Ok(day),
            Err(_) => bail!("schedule.weekly_day: unrecognised weekday '{}'", self.weekly_day),
        }
    }
}

// ── Concurrency caps ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Maximum `#lookup` requests in flight during the daily run.
    pub lookup_parallelism: usize,
    /// Maximum weekly tag summaries in flight.  Clamped to 3 at runtime.
    pub weekly_summary_parallelism: usize,
    /// Maximum concurrent file reads.  `0` means "available parallelism".
    pub file_read_parallelism: usize,
    /// How many ISO weeks (including the current one) the backlog review scans.
    pub backlog_weeks: u32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            lookup_parallelism: 4,
            weekly_summary_parallelism: 3,
            file_read_parallelism: 0,
            backlog_weeks: 4,
        }
    }
}

pub const MAX_WEEKLY_SUMMARY_PARALLELISM: usize = 3;

impl ConcurrencyConfig {
    pub fn effective_file_reads(&self) -> usize {
        if self.file_read_parallelism > 0 {
            return self.file_read_parallelism;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    pub fn effective_weekly_summaries(&self) -> usize {
        self.weekly_summary_parallelism
            .clamp(1, MAX_WEEKLY_SUMMARY_PARALLELISM)
    }
}

// ── LLM provider ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `"openrouter"` or `"ollama"`.
    pub provider: String,
    pub ollama_model: String,
    pub openrouter_model: String,
    /// Base URL for the Ollama API.  Overridden at runtime by the
    /// `OLLAMA_BASE_URL` environment variable when set.
    pub ollama_base_url: String,
    pub openrouter_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            ollama_model: "llama3.1:8b".to_string(),
            openrouter_model: "openai/gpt-4o-mini".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            request_timeout_secs: 120,
        }
    }
}

// ── Prompts ──────────────────────────────────────────────────────────────────

pub const DEFAULT_DAILY_PROMPT: &str = "You are a personal knowledge assistant. Summarize the \
following daily notes into a short, well-structured Markdown digest. Group related thoughts, \
surface decisions and open questions, and keep the author's voice. Do not invent facts.";

pub const DEFAULT_LOOKUP_PROMPT: &str = "You are a concise research assistant. Explain the \
following question or term in two to four sentences of plain Markdown. If the question is \
ambiguous, answer the most likely interpretation.";

pub const DEFAULT_WEEKLY_PROMPT: &str = "You review one week of tagged notes. Identify recurring \
themes, notable patterns and anything that deserves follow-up. Answer in a short Markdown list.";

pub const DEFAULT_COACHING_PROMPT: &str = "You are a thoughtful personal coach. Read the whole \
week of notes below and write a brief reflection: what went well, what drained energy, and one \
or two gentle suggestions for the coming week.";

pub const DEFAULT_INTENTIONS_PROMPT: &str = "The following tasks were left unfinished last week. \
Turn them into a short, prioritised list of intentions for next week. Merge duplicates and drop \
anything that looks obsolete.";

pub const DEFAULT_BACKLOG_PROMPT: &str = "The following open tasks were collected from the last \
few weeks of notes. Review the backlog: group related tasks, flag the ones that look stale, and \
suggest which three to tackle first.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub daily: String,
    pub lookup: String,
    /// Used for weekly tag summaries when the tag has no prompt of its own.
    pub weekly_default: String,
    pub coaching: String,
    pub intentions: String,
    pub backlog: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            daily: DEFAULT_DAILY_PROMPT.to_string(),
            lookup: DEFAULT_LOOKUP_PROMPT.to_string(),
            weekly_default: DEFAULT_WEEKLY_PROMPT.to_string(),
            coaching: DEFAULT_COACHING_PROMPT.to_string(),
            intentions: DEFAULT_INTENTIONS_PROMPT.to_string(),
            backlog: DEFAULT_BACKLOG_PROMPT.to_string(),
        }
    }
}

// ── Tags ─────────────────────────────────────────────────────────────────────

/// One recognised hashtag.  Names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagConfig {
    pub name: String,
    /// Custom system prompt for this tag's weekly summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl TagConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Case-folded identity of a tag name.  Every comparison between tag names
/// (validation, lookup, matching) goes through this.
pub fn tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn default_tags() -> Vec<TagConfig> {
    vec![
        TagConfig::new("task"),
        TagConfig::new("lookup"),
        TagConfig::new("idea"),
        TagConfig::new("learning"),
    ]
}

// ── Telemetry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// When non-empty, logs are also written to a daily-rolling file here.
    pub log_dir: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: String::new(),
        }
    }
}

// ── Root ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub vault: VaultConfig,
    pub schedule: ScheduleConfig,
    pub concurrency: ConcurrencyConfig,
    pub llm: LlmConfig,
    pub prompts: PromptConfig,
    pub telemetry: TelemetryConfig,
    pub tags: Vec<TagConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            schedule: ScheduleConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            llm: LlmConfig::default(),
            prompts: PromptConfig::default(),
            telemetry: TelemetryConfig::default(),
            tags: default_tags(),
        }
    }
}

impl AppConfig {
    /// Load the config file, falling back to defaults when it does not exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: Self = match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)
                .with_context(|| format!("parse config {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => Self::default(),
            Err(err) => {
                return Err(err).with_context(|| format!("read config {}", path.display()));
            }
        };

        if let Ok(value) = env::var("VAULTWISE_VAULT_ROOT") {
            if !value.trim().is_empty() {
                config.vault.root = value;
            }
        }

        if let Ok(value) = env::var("OLLAMA_BASE_URL") {
            if !value.trim().is_empty() {
                config.llm.ollama_base_url = value;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Reject settings the processors cannot run with.  Called once at
    /// startup, before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if self.tags.is_empty() {
            bail!("at least one [[tags]] entry is required");
        }
        let mut seen: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let name = tag.name.trim();
            if name.is_empty() {
                bail!("tag names must not be empty");
            }
            if name.starts_with('#') || name.chars().any(char::is_whitespace) {
                bail!("tag '{name}' must be a bare word without '#' or whitespace");
            }
            let key = tag_key(name);
            if seen.contains(&key) {
                bail!("duplicate tag '{name}' (tag names are case-insensitive)");
            }
            seen.push(key);
        }

        self.schedule.weekday()?;

        if self.vault.input_file.trim().is_empty() {
            bail!("vault.input_file must not be empty");
        }
        if self.vault.ignore_prefix.trim().is_empty() {
            bail!("vault.ignore_prefix must not be empty");
        }
        if self.concurrency.lookup_parallelism == 0 {
            bail!("concurrency.lookup_parallelism must be at least 1");
        }
        if self.concurrency.weekly_summary_parallelism == 0 {
            bail!("concurrency.weekly_summary_parallelism must be at least 1");
        }
        if self.concurrency.backlog_weeks == 0 {
            bail!("concurrency.backlog_weeks must be at least 1");
        }

        let provider = self.llm.provider.to_lowercase();
        if provider != "openrouter" && provider != "ollama" {
            bail!("llm.provider must be 'openrouter' or 'ollama', got '{}'", self.llm.provider);
        }

        Ok(())
    }

    pub fn active_model(&self) -> &str {
        if self.llm.provider.eq_ignore_ascii_case("openrouter") {
            &self.llm.openrouter_model
        } else {
            &self.llm.ollama_model
        }
    }

    pub fn tag(&self, name: &str) -> Option<&TagConfig> {
        self.tags
            .iter()
            .find(|tag| tag_key(&tag.name) == tag_key(name))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
