use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{info, warn};

use vaultwise_config::AppConfig;
use vaultwise_llm::{LlmSummarizer, Summarizer};
use vaultwise_notes::{
    BacklogProcessor, CancelSignal, DailyProcessor, Outcome, WeeklyProcessor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Job {
    Daily,
    Weekly,
    Backlog,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Job::Daily => "daily",
            Job::Weekly => "weekly",
            Job::Backlog => "backlog",
        }
    }
}

/// Run `jobs` in order, stopping at the first failure.  Ctrl-C or SIGTERM
/// cancels whatever is in flight.
pub(crate) async fn run_jobs(config: &AppConfig, today: NaiveDate, jobs: &[Job]) -> Result<()> {
    let llm = LlmSummarizer::from_config(config)?;
    info!(provider = ?llm.provider(), model = llm.model(), %today, "starting");
    let summarizer: Arc<dyn Summarizer> = Arc::new(llm);

    let (cancel_tx, cancel) = CancelSignal::channel();
    let signals = tokio::spawn(forward_shutdown(cancel_tx));

    let mut result = Ok(());
    for job in jobs {
        result = run_job(*job, config, summarizer.clone(), today, &cancel).await;
        if result.is_err() {
            break;
        }
    }

    signals.abort();
    result
}

async fn run_job(
    job: Job,
    config: &AppConfig,
    summarizer: Arc<dyn Summarizer>,
    today: NaiveDate,
    cancel: &CancelSignal,
) -> Result<()> {
    match job {
        Job::Daily => match DailyProcessor::new(config, summarizer).run(today, cancel).await? {
            Outcome::Skipped(reason) => skipped(job, &reason),
            Outcome::Completed(report) => {
                println!(
                    "daily: {} lines processed, {} lookups, {} completed / {} pending tasks -> {}",
                    report.processed_lines,
                    report.lookups,
                    report.tasks.completed.len(),
                    report.tasks.pending.len(),
                    report.focus_file.display()
                );
            }
        },
        Job::Weekly => match WeeklyProcessor::new(config, summarizer).run(today, cancel).await? {
            Outcome::Skipped(reason) => skipped(job, &reason),
            Outcome::Completed(report) => {
                println!(
                    "weekly: {} from {} files, {} tag summaries -> {}",
                    report.week,
                    report.files_read,
                    report.tag_summaries.len(),
                    report.summary_file.display()
                );
            }
        },
        Job::Backlog => match BacklogProcessor::new(config, summarizer).run(today, cancel).await? {
            Outcome::Skipped(reason) => skipped(job, &reason),
            Outcome::Completed(report) => {
                println!(
                    "backlog: {} open tasks over {} weeks -> {}",
                    report.open_tasks.len(),
                    report.weeks.len(),
                    report.focus_file.display()
                );
            }
        },
    }
    Ok(())
}

fn skipped(job: Job, reason: &impl std::fmt::Display) {
    println!("{}: skipped ({reason})", job.name());
}

async fn forward_shutdown(cancel_tx: watch::Sender<bool>) {
    match wait_for_shutdown().await {
        Ok(()) => {
            warn!("shutdown requested, cancelling");
            let _ = cancel_tx.send(true);
        }
        Err(err) => warn!(error = %err, "signal handler unavailable"),
    }
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
