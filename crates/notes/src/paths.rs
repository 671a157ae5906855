use std::path::PathBuf;

use chrono::NaiveDate;

use vaultwise_config::VaultConfig;

use crate::calendar::IsoWeek;

/// Resolves every file the processors read or write.
///
/// | artifact | path |
/// |---|---|
/// | inbox | `<root>/<input_file>` |
/// | archive | `<root>/<archive_path>/<year>/Week_<ww>/<archive_prefix><yyyy-mm-dd>.md` |
/// | focus | `<root>/<focus_path>/<year>/<focus_prefix><ww>.md` |
/// | summary | `<root>/<focus_path>/<year>/<focus_prefix><ww>_Summary.md` |
///
/// `<year>` is the ISO week-numbering year and `<ww>` the zero-padded ISO week.
#[derive(Debug, Clone)]
pub struct VaultPaths {
    root: PathBuf,
    vault: VaultConfig,
}

impl VaultPaths {
    pub fn new(vault: &VaultConfig) -> Self {
        Self {
            root: vault.root_path(),
            vault: vault.clone(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn inbox(&self) -> PathBuf {
        self.root.join(&self.vault.input_file)
    }

    pub fn archive_dir(&self, week: IsoWeek) -> PathBuf {
        self.root
            .join(&self.vault.archive_path)
            .join(week.year().to_string())
            .join(format!("Week_{:02}", week.week()))
    }

    pub fn archive_file(&self, date: NaiveDate) -> PathBuf {
        self.archive_dir(IsoWeek::of(date)).join(format!(
            "{}{}.md",
            self.vault.archive_prefix,
            date.format("%Y-%m-%d")
        ))
    }

    pub fn focus_file(&self, week: IsoWeek) -> PathBuf {
        self.focus_dir(week)
            .join(format!("{}{:02}.md", self.vault.focus_prefix, week.week()))
    }

    pub fn summary_file(&self, week: IsoWeek) -> PathBuf {
        self.focus_dir(week)
            .join(format!("{}{:02}_Summary.md", self.vault.focus_prefix, week.week()))
    }

    fn focus_dir(&self, week: IsoWeek) -> PathBuf {
        self.root
            .join(&self.vault.focus_path)
            .join(week.year().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn paths() -> VaultPaths {
        VaultPaths::new(&VaultConfig {
            root: "/vault".to_string(),
            ..VaultConfig::default()
        })
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn inbox_is_relative_to_root() {
        assert_eq!(paths().inbox(), Path::new("/vault/Inbox.md"));
    }

    #[test]
    fn archive_file_layout() {
        assert_eq!(
            paths().archive_file(date("2026-03-04")),
            Path::new("/vault/Archive/2026/Week_10/Daily_2026-03-04.md")
        );
    }

    #[test]
    fn focus_and_summary_layout() {
        let week = IsoWeek::of(date("2026-10-19"));
        assert_eq!(paths().focus_file(week), Path::new("/vault/Focus/2026/Week_43.md"));
        assert_eq!(
            paths().summary_file(week),
            Path::new("/vault/Focus/2026/Week_43_Summary.md")
        );
    }

    #[test]
    fn archive_uses_iso_year_around_new_year() {
        // Calendar 2027, ISO 2026-W53.
        assert_eq!(
            paths().archive_file(date("2027-01-01")),
            Path::new("/vault/Archive/2026/Week_53/Daily_2027-01-01.md")
        );
    }
}
