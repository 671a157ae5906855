//! Daily run: inbox → summarized section in the week's focus file, plus an
//! archive snapshot and a pruned inbox.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use vaultwise_config::AppConfig;
use vaultwise_llm::Summarizer;

use crate::calendar::IsoWeek;
use crate::cancel::CancelSignal;
use crate::files;
use crate::paths::VaultPaths;
use crate::tags::{
    LOOKUP_TAG, TASK_TAG, TagGroups, TaskClassification, classify_tasks, contains_tag,
    extract_tagged_sections, is_checked_task,
};
use crate::{Outcome, SkipReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub query: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub focus_file: PathBuf,
    pub archive_file: PathBuf,
    pub processed_lines: usize,
    pub ignored_lines: usize,
    pub summarized: bool,
    pub lookups: usize,
    pub tasks: TaskClassification,
}

pub type DailyOutcome = Outcome<DailyReport>;

pub struct DailyProcessor {
    config: AppConfig,
    paths: VaultPaths,
    summarizer: Arc<dyn Summarizer>,
}

impl DailyProcessor {
    pub fn new(config: &AppConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            config: config.clone(),
            paths: VaultPaths::new(&config.vault),
            summarizer,
        }
    }

    pub async fn run(&self, today: NaiveDate, cancel: &CancelSignal) -> Result<DailyOutcome> {
        let inbox = self.paths.inbox();
        let Some(lines) = files::read_lines(&inbox).await? else {
            info!(inbox = %inbox.display(), "daily: inbox missing, nothing to do");
            return Ok(Outcome::Skipped(SkipReason::InboxMissing(inbox)));
        };
        if lines.iter().all(|line| line.trim().is_empty()) {
            info!(inbox = %inbox.display(), "daily: inbox empty, nothing to do");
            return Ok(Outcome::Skipped(SkipReason::InboxEmpty(inbox)));
        }

        let (ignored, to_process) = partition_ignored(lines, &self.config.vault.ignore_prefix);

        let mut groups = TagGroups::from_config(&self.config.tags);
        extract_tagged_sections(&mut groups, &to_process);

        let general = general_content(&to_process);
        info!(
            lines = to_process.len(),
            ignored = ignored.len(),
            general = general.len(),
            tagged = groups.total_lines(),
            "daily: processing inbox"
        );

        let summary = if general.is_empty() {
            None
        } else {
            let text = general.join("\n");
            Some(cancel.guard(self.summarizer.summarize(&text)).await?)
        };

        let lookups = self.run_lookups(groups.lines(LOOKUP_TAG), cancel).await?;
        let tasks = classify_tasks(groups.lines(TASK_TAG));

        let week = IsoWeek::of(today);
        let focus_file = self.paths.focus_file(week);
        let new_focus_file = !files::exists(&focus_file).await?;
        let block = render_daily(
            today,
            new_focus_file.then_some(week),
            summary.as_deref(),
            &groups,
            &tasks,
            &lookups,
        );

        cancel.check()?;
        let block = if new_focus_file { block } else { format!("\n{block}") };
        files::append_text(&focus_file, &block).await?;

        let archive_file = self.paths.archive_file(today);
        files::write_lines(&archive_file, &to_process).await?;
        files::write_lines(&inbox, &ignored).await?;

        info!(
            focus = %focus_file.display(),
            archive = %archive_file.display(),
            lookups = lookups.len(),
            completed = tasks.completed.len(),
            pending = tasks.pending.len(),
            "daily: complete"
        );

        Ok(Outcome::Completed(DailyReport {
            focus_file,
            archive_file,
            processed_lines: to_process.len(),
            ignored_lines: ignored.len(),
            summarized: summary.is_some(),
            lookups: lookups.len(),
            tasks,
        }))
    }

    /// One lookup per query, `lookup_parallelism` at a time.  Results arrive in
    /// completion order.
    async fn run_lookups(&self, queries: &[String], cancel: &CancelSignal) -> Result<Vec<LookupResult>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        cancel.check()?;
        debug!(count = queries.len(), "daily: dispatching lookups");

        let summarizer = &self.summarizer;
        stream::iter(queries.iter().cloned())
            .map(|query| async move {
                let response = cancel.guard(summarizer.lookup(&query)).await?;
                Ok::<_, anyhow::Error>(LookupResult { query, response })
            })
            .buffer_unordered(self.config.concurrency.lookup_parallelism.max(1))
            .try_collect()
            .await
    }
}

/// `(ignored, to_process)`: ignored lines start with `prefix`
/// case-insensitively once leading whitespace is removed.
pub fn partition_ignored(lines: Vec<String>, prefix: &str) -> (Vec<String>, Vec<String>) {
    let prefix = prefix.to_lowercase();
    lines
        .into_iter()
        .partition(|line| line.trim_start().to_lowercase().starts_with(&prefix))
}

/// Lines worth a general summary: non-blank, not a finished task, not a lookup.
pub fn general_content(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !is_checked_task(line))
        .filter(|line| !contains_tag(line, LOOKUP_TAG))
        .map(|line| line.trim().to_string())
        .collect()
}

pub fn render_daily(
    today: NaiveDate,
    week_heading: Option<IsoWeek>,
    summary: Option<&str>,
    groups: &TagGroups,
    tasks: &TaskClassification,
    lookups: &[LookupResult],
) -> String {
    let mut out = String::new();
    if let Some(week) = week_heading {
        out.push_str(&format!("# Week {:02} ({})\n\n", week.week(), week.year()));
    }
    out.push_str(&format!("## {} ({})\n\n", today.format("%Y-%m-%d"), today.format("%A")));

    if let Some(summary) = summary {
        out.push_str("### Summary\n\n");
        out.push_str(summary.trim());
        out.push_str("\n\n");
    }

    for group in groups.non_empty() {
        out.push_str(&format!("### {}\n\n", group.name));
        for line in &group.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    if !tasks.is_empty() {
        out.push_str("### Task Summary\n\n");
        for (heading, lines) in [("Completed", &tasks.completed), ("Pending", &tasks.pending)] {
            if lines.is_empty() {
                continue;
            }
            out.push_str(&format!("#### {heading}\n\n"));
            for line in lines {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }
    }

    if !lookups.is_empty() {
        out.push_str("### Lookup Results\n\n");
        for lookup in lookups {
            out.push_str(&format!("{}:> {}\n", lookup.query, lookup.response.trim()));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockSummarizer, config_for, date, read, write};
    use std::time::Duration;
    use tempfile::TempDir;

    fn processor(config: &AppConfig, mock: &Arc<MockSummarizer>) -> DailyProcessor {
        DailyProcessor::new(config, mock.clone())
    }

    #[tokio::test]
    async fn missing_inbox_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        let mock = Arc::new(MockSummarizer::new());

        let outcome = processor(&config, &mock)
            .run(date("2026-10-20"), &CancelSignal::never())
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::InboxMissing(_))));
        assert!(mock.calls().is_empty());
        assert!(!dir.path().join("Focus").exists());
    }

    #[tokio::test]
    async fn blank_inbox_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        write(&dir.path().join("Inbox.md"), "\n   \n");
        let mock = Arc::new(MockSummarizer::new());

        let outcome = processor(&config, &mock)
            .run(date("2026-10-20"), &CancelSignal::never())
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::InboxEmpty(_))));
        assert_eq!(read(&dir.path().join("Inbox.md")), "\n   \n");
    }

    #[tokio::test]
    async fn tasks_are_split_and_inbox_pruned() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        let inbox = dir.path().join("Inbox.md");
        write(
            &inbox,
            "Buy milk #task\n- [x] Done already #task\n@ignore Note to self",
        );
        let mock = Arc::new(MockSummarizer::new());
        let today = date("2026-10-20");

        let report = processor(&config, &mock)
            .run(today, &CancelSignal::never())
            .await
            .unwrap()
            .completed()
            .unwrap();

        let focus = read(&dir.path().join("Focus/2026/Week_43.md"));
        let task_summary = &focus[focus.find("### Task Summary").unwrap()..];
        let completed = task_summary.find("#### Completed").unwrap();
        let pending = task_summary.find("#### Pending").unwrap();
        let done_at = task_summary.find("- [x] Done already #task").unwrap();
        let milk_at = task_summary.find("Buy milk #task").unwrap();
        assert!(completed < done_at && done_at < pending);
        assert!(pending < milk_at);

        assert_eq!(read(&inbox), "@ignore Note to self\n");
        assert_eq!(
            read(&dir.path().join("Archive/2026/Week_43/Daily_2026-10-20.md")),
            "Buy milk #task\n- [x] Done already #task\n"
        );
        assert_eq!(report.tasks.completed, ["- [x] Done already #task"]);
        assert_eq!(report.tasks.pending, ["Buy milk #task"]);
        assert_eq!(report.ignored_lines, 1);

        // Only the unfinished task counts as general content.
        assert_eq!(mock.calls(), [Call::Summarize("Buy milk #task".to_string())]);
    }

    #[tokio::test]
    async fn lookup_results_are_written() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        write(&dir.path().join("Inbox.md"), "What is ISO 8601? #lookup\n");
        let mock = Arc::new(MockSummarizer::new());

        let report = processor(&config, &mock)
            .run(date("2026-10-20"), &CancelSignal::never())
            .await
            .unwrap()
            .completed()
            .unwrap();

        let focus = read(&report.focus_file);
        assert!(focus.contains("### Lookup Results"));
        assert!(
            focus
                .lines()
                .any(|line| line == "What is ISO 8601? #lookup:> A date standard"),
            "{focus}"
        );
        // Lookup lines are not part of the general summary.
        assert!(!report.summarized);
        assert_eq!(mock.calls(), [Call::Lookup("What is ISO 8601? #lookup".to_string())]);
    }

    #[tokio::test]
    async fn lookups_respect_parallelism_cap() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(dir.path());
        config.concurrency.lookup_parallelism = 2;
        let inbox: String = (0..6).map(|i| format!("question {i} #lookup\n")).collect();
        write(&dir.path().join("Inbox.md"), &inbox);
        let mock = Arc::new(MockSummarizer::with_delay(Duration::from_millis(20)));

        let report = processor(&config, &mock)
            .run(date("2026-10-20"), &CancelSignal::never())
            .await
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(report.lookups, 6);
        assert!(mock.max_concurrency() <= 2, "{}", mock.max_concurrency());
    }

    #[tokio::test]
    async fn week_heading_only_on_new_focus_file() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        let inbox = dir.path().join("Inbox.md");
        let mock = Arc::new(MockSummarizer::new());
        let daily = processor(&config, &mock);

        write(&inbox, "Monday thought\n");
        daily.run(date("2026-10-19"), &CancelSignal::never()).await.unwrap();
        write(&inbox, "Tuesday thought\n");
        daily.run(date("2026-10-20"), &CancelSignal::never()).await.unwrap();

        let focus = read(&dir.path().join("Focus/2026/Week_43.md"));
        assert_eq!(focus.matches("# Week 43 (2026)").count(), 1);
        assert!(focus.starts_with("# Week 43 (2026)"));
        assert!(focus.contains("## 2026-10-19 (Monday)"));
        assert!(focus.contains("## 2026-10-20 (Tuesday)"));
        assert_eq!(focus.matches("### Summary").count(), 2);
    }

    #[tokio::test]
    async fn only_ignored_lines_still_writes_day() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        let inbox = dir.path().join("Inbox.md");
        write(&inbox, "  @IGNORE keep me\n");
        let mock = Arc::new(MockSummarizer::new());

        let report = processor(&config, &mock)
            .run(date("2026-10-19"), &CancelSignal::never())
            .await
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(report.processed_lines, 0);
        assert_eq!(report.ignored_lines, 1);
        assert!(mock.calls().is_empty());
        assert_eq!(
            read(&dir.path().join("Focus/2026/Week_43.md")),
            "# Week 43 (2026)\n\n## 2026-10-19 (Monday)\n\n"
        );
        assert_eq!(
            read(&dir.path().join("Archive/2026/Week_43/Daily_2026-10-19.md")),
            ""
        );
        assert_eq!(read(&inbox), "  @IGNORE keep me\n");
    }

    #[tokio::test]
    async fn summarizer_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        let inbox = dir.path().join("Inbox.md");
        write(&inbox, "A thought\n");
        let mock = Arc::new(MockSummarizer::failing());

        let err = processor(&config, &mock)
            .run(date("2026-10-20"), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("provider unavailable"));
        assert_eq!(read(&inbox), "A thought\n");
        assert!(!dir.path().join("Focus").exists());
        assert!(!dir.path().join("Archive").exists());
    }

    #[tokio::test]
    async fn cancelled_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path());
        let inbox = dir.path().join("Inbox.md");
        write(&inbox, "A thought\n");
        let mock = Arc::new(MockSummarizer::new());
        let (tx, cancel) = CancelSignal::channel();
        tx.send(true).unwrap();

        let err = processor(&config, &mock)
            .run(date("2026-10-20"), &cancel)
            .await
            .unwrap_err();
        assert!(crate::is_cancellation(&err));
        assert!(mock.calls().is_empty());
        assert_eq!(read(&inbox), "A thought\n");
    }

    #[test]
    fn partition_ignored_is_case_insensitive_after_left_trim() {
        let lines = vec![
            "@ignore a".to_string(),
            "   @Ignore b".to_string(),
            "keep @ignore".to_string(),
            String::new(),
        ];
        let (ignored, kept) = partition_ignored(lines, "@ignore");
        assert_eq!(ignored, ["@ignore a", "   @Ignore b"]);
        assert_eq!(kept, ["keep @ignore", ""]);
    }

    #[test]
    fn general_content_excludes_done_tasks_and_lookups() {
        let lines: Vec<String> = [
            "  plain note ",
            "",
            "- [x] done #task",
            "- [ ] open #task",
            "what is this #LOOKUP",
        ]
        .map(String::from)
        .to_vec();
        assert_eq!(general_content(&lines), ["plain note", "- [ ] open #task"]);
    }

    #[test]
    fn render_daily_layout() {
        let mut groups = TagGroups::new(["task", "idea"]);
        extract_tagged_sections(&mut groups, ["Buy milk #task", "Kite #idea"]);
        let tasks = classify_tasks(groups.lines("task"));
        let lookups = vec![LookupResult {
            query: "Q #lookup".to_string(),
            response: "Answer\n".to_string(),
        }];

        let text = render_daily(
            date("2026-10-20"),
            Some(IsoWeek::of(date("2026-10-20"))),
            Some("Digest"),
            &groups,
            &tasks,
            &lookups,
        );
        assert_eq!(
            text,
            "# Week 43 (2026)\n\n\
             ## 2026-10-20 (Tuesday)\n\n\
             ### Summary\n\nDigest\n\n\
             ### task\n\nBuy milk #task\n\n\
             ### idea\n\nKite #idea\n\n\
             ### Task Summary\n\n#### Pending\n\nBuy milk #task\n\n\
             ### Lookup Results\n\nQ #lookup:> Answer\n\n"
        );
    }
}
