//! Backlog review: open `#task` lines from the last few weeks of archives,
//! reviewed once and appended to the current focus file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use vaultwise_config::AppConfig;
use vaultwise_llm::Summarizer;

use crate::calendar::IsoWeek;
use crate::cancel::CancelSignal;
use crate::files;
use crate::paths::VaultPaths;
use crate::tags::{TASK_TAG, contains_tag, is_checked_task};
use crate::{Outcome, SkipReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogReport {
    pub focus_file: PathBuf,
    pub weeks: Vec<IsoWeek>,
    pub open_tasks: Vec<String>,
}

pub type BacklogOutcome = Outcome<BacklogReport>;

pub struct BacklogProcessor {
    config: AppConfig,
    paths: VaultPaths,
    summarizer: Arc<dyn Summarizer>,
}

impl BacklogProcessor {
    pub fn new(config: &AppConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            config: config.clone(),
            paths: VaultPaths::new(&config.vault),
            summarizer,
        }
    }

    pub async fn run(&self, today: NaiveDate, cancel: &CancelSignal) -> Result<BacklogOutcome> {
        let scheduled = self.config.schedule.weekday()?;
        if today.weekday() != scheduled {
            debug!(today = %today.weekday(), scheduled = %scheduled, "backlog: not scheduled today");
            return Ok(Outcome::Skipped(SkipReason::NotScheduledDay {
                today: today.weekday(),
                scheduled,
            }));
        }

        let current = IsoWeek::of(today);
        let focus_file = self.paths.focus_file(current);
        if !files::exists(&focus_file).await? {
            info!(focus = %focus_file.display(), "backlog: focus file not created yet");
            return Ok(Outcome::Skipped(SkipReason::FocusFileMissing(focus_file)));
        }

        let weeks: Vec<IsoWeek> = (0..self.config.concurrency.backlog_weeks)
            .rev()
            .map(|back| current.weeks_back(back))
            .collect();
        let lines = self.read_weeks(&weeks).await?;
        let open_tasks = open_tasks(&lines);
        if open_tasks.is_empty() {
            info!(weeks = weeks.len(), "backlog: no open tasks");
            return Ok(Outcome::Skipped(SkipReason::NoOpenTasks));
        }

        info!(weeks = weeks.len(), tasks = open_tasks.len(), "backlog: reviewing open tasks");
        let review = cancel
            .guard(
                self.summarizer
                    .summarize_patterns(&self.config.prompts.backlog, &open_tasks.join("\n")),
            )
            .await?;

        cancel.check()?;
        let block = format!("\n## Task Backlog Review\n\n{}\n", review.trim());
        files::append_text(&focus_file, &block).await?;
        info!(focus = %focus_file.display(), "backlog: complete");

        Ok(Outcome::Completed(BacklogReport {
            focus_file,
            weeks,
            open_tasks,
        }))
    }

    /// Lines of every archive file in `weeks`, oldest week first.  Weeks and
    /// the files inside each week are read through separate bounded pools.
    async fn read_weeks(&self, weeks: &[IsoWeek]) -> Result<Vec<String>> {
        let file_reads = self.config.concurrency.effective_file_reads();
        let per_week: Vec<Vec<String>> = stream::iter(weeks.iter().copied())
            .map(|week| async move {
                let dir = self.paths.archive_dir(week);
                let archive_files = files::list_markdown_files(&dir).await?;
                debug!(week = %week, files = archive_files.len(), "backlog: scanning week");
                files::read_all_lines(archive_files, file_reads).await
            })
            .buffered(weeks.len().max(1))
            .try_collect()
            .await?;
        Ok(per_week.into_iter().flatten().collect())
    }
}

/// `#task` lines that are not checked off, deduplicated case-insensitively.
/// The first spelling seen is kept.
pub fn open_tasks<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| contains_tag(line, TASK_TAG) && !is_checked_task(line))
        .filter(|line| seen.insert(line.to_lowercase()))
        .map(ToString::to_string)
        .collect()
}
