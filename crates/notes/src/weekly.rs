//! Weekly run: last week's archive → per-tag pattern summaries, a coaching
//! reflection and intentions, appended to that week's summary file.

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
use crate::tags::{TASK_TAG, TagGroups, extract_tagged_sections, is_unchecked_task};
use crate::{Outcome, SkipReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    pub tag: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReport {
    pub week: IsoWeek,
    pub summary_file: PathBuf,
    pub files_read: usize,
    pub tag_summaries: Vec<TagSummary>,
    pub intentions: bool,
}

pub type WeeklyOutcome = Outcome<WeeklyReport>;

pub struct WeeklyProcessor {
    config: AppConfig,
    paths: VaultPaths,
    summarizer: Arc<dyn Summarizer>,
}

impl WeeklyProcessor {
    pub fn new(config: &AppConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            config: config.clone(),
            paths: VaultPaths::new(&config.vault),
            summarizer,
        }
    }

    pub async fn run(&self, today: NaiveDate, cancel: &CancelSignal) -> Result<WeeklyOutcome> {
        let scheduled = self.config.schedule.weekday()?;
        if today.weekday() != scheduled {
            debug!(today = %today.weekday(), scheduled = %scheduled, "weekly: not scheduled today");
            return Ok(Outcome::Skipped(SkipReason::NotScheduledDay {
                today: today.weekday(),
                scheduled,
            }));
        }

        let week = IsoWeek::of(today).previous();
        let archive_dir = self.paths.archive_dir(week);
        if !files::exists(&archive_dir).await? {
            info!(week = %week, dir = %archive_dir.display(), "weekly: no archive for last week");
            return Ok(Outcome::Skipped(SkipReason::ArchiveMissing(archive_dir)));
        }
        let archive_files = files::list_markdown_files(&archive_dir).await?;
        if archive_files.is_empty() {
            info!(week = %week, dir = %archive_dir.display(), "weekly: archive has no notes");
            return Ok(Outcome::Skipped(SkipReason::NoArchiveFiles(archive_dir)));
        }

        let files_read = archive_files.len();
        let lines = files::read_all_lines(
            archive_files,
            self.config.concurrency.effective_file_reads(),
        )
        .await?;
        if lines.iter().all(|line| line.trim().is_empty()) {
            info!(week = %week, "weekly: archive is blank");
            return Ok(Outcome::Skipped(SkipReason::NoArchiveContent(week)));
        }

        let mut groups = TagGroups::from_config(&self.config.tags);
        extract_tagged_sections(&mut groups, &lines);
        info!(
            week = %week,
            files = files_read,
            lines = lines.len(),
            tagged = groups.total_lines(),
            "weekly: aggregating"
        );

        let tag_summaries = self.summarize_tags(&groups, cancel).await?;

        let week_text = lines.join("\n");
        let coaching = cancel
            .guard(
                self.summarizer
                    .summarize_patterns(&self.config.prompts.coaching, &week_text),
            )
            .await?;

        let open_tasks: Vec<&str> = groups
            .lines(TASK_TAG)
            .iter()
            .filter(|line| is_unchecked_task(line))
            .map(String::as_str)
            .collect();
        let intentions = if open_tasks.is_empty() {
            None
        } else {
            Some(
                cancel
                    .guard(self.summarizer.summarize_patterns(
                        &self.config.prompts.intentions,
                        &open_tasks.join("\n"),
                    ))
                    .await?,
            )
        };

        let summary_file = self.paths.summary_file(week);
        let mut block = render_weekly(week, &tag_summaries, &coaching, intentions.as_deref());
        if files::exists(&summary_file).await? {
            block.insert(0, '\n');
        }

        cancel.check()?;
        files::append_text(&summary_file, &block).await?;
        info!(
            week = %week,
            file = %summary_file.display(),
            tags = tag_summaries.len(),
            intentions = intentions.is_some(),
            "weekly: complete"
        );

        Ok(Outcome::Completed(WeeklyReport {
            week,
            summary_file,
            files_read,
            tag_summaries,
            intentions: intentions.is_some(),
        }))
    }

    /// One pattern summary per non-empty group, sorted by tag name.
    async fn summarize_tags(&self, groups: &TagGroups, cancel: &CancelSignal) -> Result<Vec<TagSummary>> {
        cancel.check()?;
        let summarizer = &self.summarizer;
        let requests: Vec<(String, String, String)> = groups
            .non_empty()
            .map(|group| {
                let prompt = self
                    .config
                    .tag(&group.name)
                    .and_then(|tag| tag.prompt.clone())
                    .unwrap_or_else(|| self.config.prompts.weekly_default.clone());
                (group.name.clone(), prompt, group.lines.join("\n"))
            })
            .collect();

        let mut summaries: Vec<TagSummary> = stream::iter(requests)
            .map(|(tag, prompt, content)| async move {
                debug!(tag = %tag, lines = content.lines().count(), "weekly: summarizing tag");
                let summary = cancel
                    .guard(summarizer.summarize_patterns(&prompt, &content))
                    .await?;
                Ok::<_, anyhow::Error>(TagSummary { tag, summary })
            })
            .buffer_unordered(self.config.concurrency.effective_weekly_summaries())
            .try_collect()
            .await?;

        summaries.sort_by_key(|s| s.tag.to_lowercase());
        Ok(summaries)
    }
}

pub fn render_weekly(
    week: IsoWeek,
    tag_summaries: &[TagSummary],
    coaching: &str,
    intentions: Option<&str>,
) -> String {
    let mut out = format!("# Weekly Summary: Week {:02} ({})\n\n", week.week(), week.year());

    if !tag_summaries.is_empty() {
        out.push_str("## Weekly Tag Summaries\n\n");
        for entry in tag_summaries {
            out.push_str(&format!("### {}\n\n{}\n\n", entry.tag, entry.summary.trim()));
        }
    }

    out.push_str(&format!("## Weekly Coaching Reflection\n\n{}\n\n", coaching.trim()));

    if let Some(intentions) = intentions {
        out.push_str(&format!("## Intentions for Next Week\n\n{}\n\n", intentions.trim()));
    }
    out
}
