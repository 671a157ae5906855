//! Vault processing: tag routing plus the daily, weekly and backlog runs.

pub mod backlog;
pub mod calendar;
pub mod cancel;
pub mod daily;
pub mod files;
pub mod paths;
pub mod tags;
pub mod weekly;

#[cfg(test)]
mod testing;

use std::fmt;
use std::path::PathBuf;

use chrono::Weekday;

pub use backlog::{BacklogOutcome, BacklogProcessor, BacklogReport};
pub use calendar::IsoWeek;
pub use cancel::{CancelSignal, Cancelled, is_cancellation};
pub use daily::{DailyOutcome, DailyProcessor, DailyReport, LookupResult};
pub use paths::VaultPaths;
pub use tags::{TagGroups, TaskClassification, classify_tasks, extract_tagged_sections};
pub use weekly::{TagSummary, WeeklyOutcome, WeeklyProcessor, WeeklyReport};

/// Why a processor returned without doing anything.  None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InboxMissing(PathBuf),
    InboxEmpty(PathBuf),
    NotScheduledDay { today: Weekday, scheduled: Weekday },
    ArchiveMissing(PathBuf),
    NoArchiveFiles(PathBuf),
    NoArchiveContent(IsoWeek),
    FocusFileMissing(PathBuf),
    NoOpenTasks,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InboxMissing(path) => write!(f, "inbox {} does not exist", path.display()),
            SkipReason::InboxEmpty(path) => write!(f, "inbox {} is empty", path.display()),
            SkipReason::NotScheduledDay { today, scheduled } => {
                write!(f, "today is {today}, scheduled day is {scheduled}")
            }
            SkipReason::ArchiveMissing(path) => {
                write!(f, "archive directory {} does not exist", path.display())
            }
            SkipReason::NoArchiveFiles(path) => {
                write!(f, "no Markdown files in {}", path.display())
            }
            SkipReason::NoArchiveContent(week) => write!(f, "archive for {week} is blank"),
            SkipReason::FocusFileMissing(path) => {
                write!(f, "focus file {} does not exist yet", path.display())
            }
            SkipReason::NoOpenTasks => write!(f, "no open tasks in the backlog window"),
        }
    }
}

/// Result of one processor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    Skipped(SkipReason),
    Completed(R),
}

impl<R> Outcome<R> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn completed(self) -> Option<R> {
        match self {
            Outcome::Completed(report) => Some(report),
            Outcome::Skipped(_) => None,
        }
    }
}
