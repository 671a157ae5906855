//! Hashtag routing and Markdown task-checkbox classification.
//!
//! Matching is a case-insensitive *substring* test for `#<name>`, not a
//! word-boundary match: `#tasks` is routed to the `task` group.

use vaultwise_config::{TagConfig, tag_key};

pub const TASK_TAG: &str = "task";
pub const LOOKUP_TAG: &str = "lookup";

const CHECKED_MARKERS: [&str; 2] = ["- [x]", "- [X]"];
const UNCHECKED_MARKER: &str = "- [ ]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    pub name: String,
    pub lines: Vec<String>,
    key: String,
    needle: String,
}

impl TagGroup {
    fn new(name: String) -> Self {
        let key = tag_key(&name);
        let needle = format!("#{key}");
        Self {
            name,
            lines: Vec::new(),
            key,
            needle,
        }
    }
}

/// Tag name → matching lines, in configuration order.  Name lookups are
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagGroups {
    groups: Vec<TagGroup>,
}

impl TagGroups {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups: Vec<TagGroup> = Vec::new();
        for name in names {
            let owned: String = name.into();
            let name = owned.trim();
            if name.is_empty() || groups.iter().any(|g| g.key == tag_key(name)) {
                continue;
            }
            groups.push(TagGroup::new(name.to_string()));
        }
        Self { groups }
    }

    pub fn from_config(tags: &[TagConfig]) -> Self {
        Self::new(tags.iter().map(|tag| tag.name.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&TagGroup> {
        let key = tag_key(name);
        self.groups.iter().find(|group| group.key == key)
    }

    /// Lines of `name`, or an empty slice for an unknown tag.
    pub fn lines(&self, name: &str) -> &[String] {
        self.get(name).map(|g| g.lines.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagGroup> {
        self.groups.iter()
    }

    pub fn non_empty(&self) -> impl Iterator<Item = &TagGroup> {
        self.groups.iter().filter(|group| !group.lines.is_empty())
    }

    pub fn total_lines(&self) -> usize {
        self.groups.iter().map(|group| group.lines.len()).sum()
    }
}

/// Route each non-blank line to the first group whose `#tag` it contains.
///
/// Lines are trimmed before being stored.  A line lands in at most one group
/// per call.  The same `groups` can be fed several batches.
pub fn extract_tagged_sections<'g, I, S>(groups: &'g mut TagGroups, lines: I) -> &'g mut TagGroups
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        let lowered = line.to_lowercase();
        if let Some(group) = groups
            .groups
            .iter_mut()
            .find(|group| lowered.contains(&group.needle))
        {
            group.lines.push(line.trim().to_string());
        }
    }
    groups
}

pub fn contains_tag(line: &str, tag: &str) -> bool {
    line.to_lowercase().contains(&format!("#{}", tag_key(tag)))
}

/// `- [x] ...` or `- [X] ...` after trimming.
pub fn is_checked_task(line: &str) -> bool {
    let trimmed = line.trim();
    CHECKED_MARKERS
        .iter()
        .any(|marker| trimmed.starts_with(marker))
}

/// `- [ ] ...` after trimming.
pub fn is_unchecked_task(line: &str) -> bool {
    line.trim().starts_with(UNCHECKED_MARKER)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskClassification {
    pub completed: Vec<String>,
    pub pending: Vec<String>,
}

impl TaskClassification {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.pending.is_empty()
    }
}

/// Split task lines on the checkbox marker.  Anything not checked is pending.
pub fn classify_tasks<S: AsRef<str>>(lines: &[S]) -> TaskClassification {
    let mut tasks = TaskClassification::default();
    for line in lines {
        let line = line.as_ref().to_string();
        if is_checked_task(&line) {
            tasks.completed.push(line);
        } else {
            tasks.pending.push(line);
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> TagGroups {
        TagGroups::new(names.iter().copied())
    }

    #[test]
    fn routes_lines_case_insensitively_and_trims() {
        let mut g = groups(&["task", "idea"]);
        extract_tagged_sections(
            &mut g,
            ["  Buy milk #TASK  ", "Solar kettle #Idea", "plain line", "", "   "],
        );
        assert_eq!(g.lines("task"), ["Buy milk #TASK"]);
        assert_eq!(g.lines("IDEA"), ["Solar kettle #Idea"]);
        assert_eq!(g.total_lines(), 2);
    }

    #[test]
    fn first_matching_tag_wins() {
        let mut g = groups(&["idea", "task"]);
        extract_tagged_sections(&mut g, ["Prototype #task #idea"]);
        assert_eq!(g.lines("idea"), ["Prototype #task #idea"]);
        assert!(g.lines("task").is_empty());
    }

    #[test]
    fn each_line_lands_in_at_most_one_group() {
        let tags = ["a", "ab", "b", "task", "lookup"];
        let lines = [
            "#a #b", "#ab", "#b #task", "#lookup #task #a", "none", "#TASK", "#Lookup x",
            "mixed #ab #lookup", "",
        ];
        let mut g = groups(&tags);
        extract_tagged_sections(&mut g, lines);

        let tagged = lines.iter().filter(|l| l.contains('#')).count();
        assert_eq!(g.total_lines(), tagged);
        for line in lines.iter().filter(|l| l.contains('#')) {
            let hits = g
                .iter()
                .filter(|group| group.lines.iter().any(|stored| stored == line.trim()))
                .count();
            assert_eq!(hits, 1, "{line}");
        }
    }

    #[test]
    fn accumulates_across_calls() {
        let mut g = groups(&["task"]);
        extract_tagged_sections(&mut g, ["one #task"]);
        extract_tagged_sections(&mut g, vec!["two #task".to_string()]);
        assert_eq!(g.lines("task"), ["one #task", "two #task"]);
    }

    #[test]
    fn substring_match_includes_longer_hashtags() {
        let mut g = groups(&["task"]);
        extract_tagged_sections(&mut g, ["plan #tasks for Q3"]);
        assert_eq!(g.lines("task"), ["plan #tasks for Q3"]);
    }

    #[test]
    fn duplicate_and_blank_tag_names_are_collapsed() {
        let g = groups(&["task", "TASK", " ", "idea"]);
        let names: Vec<_> = g.iter().map(|group| group.name.as_str()).collect();
        assert_eq!(names, ["task", "idea"]);
    }

    #[test]
    fn non_ascii_names_fold_consistently() {
        let mut g = groups(&["Ärger", "ärger", "ÄRGER"]);
        assert_eq!(g.iter().count(), 1);
        extract_tagged_sections(&mut g, ["Streit im Büro #ÄRGER"]);
        assert_eq!(g.lines("ärger"), ["Streit im Büro #ÄRGER"]);
        assert!(contains_tag("Streit #ärger", "Ärger"));
    }

    #[test]
    fn unknown_tag_has_no_lines() {
        assert!(groups(&["task"]).lines("nope").is_empty());
    }

    #[test]
    fn checkbox_detection() {
        assert!(is_checked_task("  - [x] done"));
        assert!(is_checked_task("- [X] done"));
        assert!(!is_checked_task("- [ ] open"));
        assert!(!is_checked_task("[x] no bullet"));
        assert!(is_unchecked_task("   - [ ] open"));
        assert!(!is_unchecked_task("- [x] done"));
    }

    #[test]
    fn classification_is_a_total_disjoint_partition() {
        let lines = [
            "- [x] Done already #task",
            "Buy milk #task",
            "- [ ] Call Bob #task",
            "- [X] Shipped #task",
            "  - [x] indented #task",
        ];
        let tasks = classify_tasks(&lines);
        assert_eq!(tasks.completed.len() + tasks.pending.len(), lines.len());
        assert_eq!(
            tasks.completed,
            ["- [x] Done already #task", "- [X] Shipped #task", "  - [x] indented #task"]
        );
        assert_eq!(tasks.pending, ["Buy milk #task", "- [ ] Call Bob #task"]);
        for line in lines {
            let in_completed = tasks.completed.iter().any(|l| l == line);
            let in_pending = tasks.pending.iter().any(|l| l == line);
            assert!(in_completed ^ in_pending, "{line}");
        }
    }

    #[test]
    fn contains_tag_is_case_insensitive() {
        assert!(contains_tag("Fix roof #Task", "task"));
        assert!(!contains_tag("task without hash", "task"));
    }
}
