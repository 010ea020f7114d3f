//! Import of a hand-maintained `KANBAN.md` board.
//!
//! ```markdown
//! ## In Progress
//! ### Home Lab
//! - [ ] **Rack the NAS**: needs rails first
//! - [x] Flash router firmware
//! ```
//!
//! `##` headings pick the column, `###` headings become a label and each
//! checkbox line becomes a task. Checked items land in `done` regardless of
//! their section. Sections without a known column are skipped.

use regex::Regex;
use std::sync::LazyLock;

use super::models::{NewTask, TaskStatus};

static SECTION_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^## (.+)").unwrap());

static SUBSECTION_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^### (.+)").unwrap());

// Either `**Title**` with an optional `: description`, or a plain title.
static TASK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- \[( |x)\] (?:\*\*(.+?)\*\*(?::?\s*(.*))?|(.+))$").unwrap()
});

static NON_SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Column for a `##` section title.
pub fn section_status(section: &str) -> Option<TaskStatus> {
    match section {
        "Backlog" => Some(TaskStatus::Backlog),
        "In Progress" => Some(TaskStatus::InProgress),
        "Review" => Some(TaskStatus::Review),
        "Completed" => Some(TaskStatus::Done),
        _ => None,
    }
}

/// Lowercase, collapse runs of other characters to `-`, trim dashes.
pub fn slugify(text: &str) -> String {
    NON_SLUG_REGEX
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Parse a markdown board into task drafts in document order. `order`
/// restarts at zero in every `##` section.
pub fn parse_kanban(content: &str) -> Vec<NewTask> {
    let mut drafts = Vec::new();
    let mut section: Option<TaskStatus> = None;
    let mut label: Option<String> = None;
    let mut order = 0i64;

    for line in content.lines() {
        let line = line.trim_end();

        if let Some(caps) = SECTION_REGEX.captures(line) {
            section = section_status(caps[1].trim());
            label = None;
            order = 0;
            continue;
        }
        if let Some(caps) = SUBSECTION_REGEX.captures(line) {
            label = Some(slugify(caps[1].trim())).filter(|l| !l.is_empty());
            continue;
        }
        let Some(status) = section else {
            continue;
        };
        let Some(caps) = TASK_REGEX.captures(line) else {
            continue;
        };

        let title = caps
            .get(2)
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let description = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
        let checked = &caps[1] == "x";

        drafts.push(NewTask {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            status: Some(if checked { TaskStatus::Done } else { status }),
            labels: Some(label.iter().cloned().collect()),
            order: Some(order),
            ..Default::default()
        });
        order += 1;
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = "# My Board

## Backlog
### Home Lab
- [ ] **Rack the NAS**: needs rails first
- [ ] Flash router firmware
random prose line
- [x] Label printer

## In Progress
- [ ] **Tax return**
- [ ] **Write blog post** draft outline

## Ideas
- [ ] Ignored because the section is unknown

## Completed
- [x] Move house
";

    #[test]
    fn test_parses_sections_titles_and_descriptions() {
        let drafts = parse_kanban(BOARD);
        let titles: Vec<_> = drafts.iter().map(|d| d.title.as_deref().unwrap()).collect();
        assert_eq!(titles, vec![
            "Rack the NAS",
            "Flash router firmware",
            "Label printer",
            "Tax return",
            "Write blog post",
            "Move house",
        ]);
        assert_eq!(drafts[0].description.as_deref(), Some("needs rails first"));
        assert_eq!(drafts[1].description.as_deref(), Some(""));
        assert_eq!(drafts[4].description.as_deref(), Some("draft outline"));
    }

    #[test]
    fn test_checked_items_are_done() {
        let drafts = parse_kanban(BOARD);
        assert_eq!(drafts[0].status, Some(TaskStatus::Backlog));
        assert_eq!(drafts[2].status, Some(TaskStatus::Done));
        assert_eq!(drafts[3].status, Some(TaskStatus::InProgress));
        assert_eq!(drafts[5].status, Some(TaskStatus::Done));
    }

    #[test]
    fn test_subsection_becomes_label_until_next_section() {
        let drafts = parse_kanban(BOARD);
        assert_eq!(drafts[0].labels.as_deref(), Some(&["home-lab".to_string()][..]));
        assert_eq!(drafts[2].labels.as_deref(), Some(&["home-lab".to_string()][..]));
        assert_eq!(drafts[3].labels.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_order_restarts_per_section() {
        let orders: Vec<_> = parse_kanban(BOARD).iter().map(|d| d.order.unwrap()).collect();
        assert_eq!(orders, vec![0, 1, 2, 0, 1, 0]);
    }

    #[test]
    fn test_windows_line_endings() {
        let drafts = parse_kanban("## Review\r\n- [ ] Check PR\r\n");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title.as_deref(), Some("Check PR"));
        assert_eq!(drafts[0].status, Some(TaskStatus::Review));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Home Lab"), "home-lab");
        assert_eq!(slugify("  C++ / Rust!! "), "c-rust");
        assert_eq!(slugify("***"), "");
    }
}
