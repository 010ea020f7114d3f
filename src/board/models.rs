use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The fixed kanban lanes a task can occupy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Backlog,
    Todo,
    InProgress,
    Review,
    Done,
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        Self::Backlog,
        Self::Todo,
        Self::InProgress,
        Self::Review,
        Self::Done,
        Self::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Review => "review",
            Self::Done => "done",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "in-progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Known board users. Tasks are assigned to exactly one of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Assignee {
    #[default]
    Josh,
    Kai,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Human-facing ticket id such as `MC-7`. Empty only in legacy files
    /// until the store backfills it on load.
    #[serde(default)]
    pub task_number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: Assignee,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub order: i64,
}

/// Fields accepted when creating a task. Anything omitted takes the board
/// default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub labels: Option<Vec<String>>,
    pub assignee: Option<Assignee>,
    pub due_date: Option<String>,
    pub order: Option<i64>,
}

/// Partial update for a task. `id`, `taskNumber` and `createdAt` are not
/// patchable and are ignored if a client sends them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub labels: Option<Vec<String>>,
    pub assignee: Option<Assignee>,
    /// `Some(None)` clears the due date; `None` leaves it untouched.
    #[serde(default, deserialize_with = "present_or_null")]
    pub due_date: Option<Option<String>>,
    pub order: Option<i64>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// One entry of a batched reorder: where a task should now sit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderUpdate {
    pub id: String,
    pub status: TaskStatus,
    pub order: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityAction {
    Created,
    Updated,
    Moved,
    Deleted,
}

/// Audit trail entry. `task_title` is a snapshot taken when the action
/// happened; later renames never rewrite it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub action: ActivityAction,
    pub task_title: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UpgradeStatus {
    #[default]
    Proposed,
    Approved,
    InProgress,
    Completed,
    Cancelled,
}

impl UpgradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Active upgrades count toward the cap and take part in ranking.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Proposed | Self::Approved | Self::InProgress)
    }
}

impl FromStr for UpgradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(Self::Proposed),
            "approved" => Ok(Self::Approved),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid upgrade status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: UpgradeStatus,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub estimated_impact: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUpgrade {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<UpgradeStatus>,
    pub rank: Option<i64>,
    pub estimated_impact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<UpgradeStatus>,
    pub rank: Option<i64>,
    pub estimated_impact: Option<String>,
}

/// Persistent counters that must survive deletions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub next_task_number: u64,
}

impl Default for Meta {
    fn default() -> Self {
        Self { next_task_number: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names_are_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(TaskStatus::from_str("in_progress").is_err());
    }

    #[test]
    fn test_upgrade_active_statuses() {
        assert!(UpgradeStatus::Proposed.is_active());
        assert!(UpgradeStatus::Approved.is_active());
        assert!(UpgradeStatus::InProgress.is_active());
        assert!(!UpgradeStatus::Completed.is_active());
        assert!(!UpgradeStatus::Cancelled.is_active());
    }

    #[test]
    fn test_task_reads_legacy_record_without_number() {
        let json = r#"{
            "id": "a1",
            "title": "Legacy",
            "description": "",
            "status": "todo",
            "priority": "high",
            "labels": ["infra"],
            "assignee": "kai",
            "createdAt": "2025-01-01T00:00:00.000Z",
            "updatedAt": "2025-01-02T00:00:00.000Z",
            "dueDate": null,
            "order": 3
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.task_number, "");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.assignee, Assignee::Kai);
        assert_eq!(task.order, 3);
        assert!(task.due_date.is_none());
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let now = Utc::now();
        let task = Task {
            id: "a1".into(),
            task_number: "MC-1".into(),
            title: "T".into(),
            description: String::new(),
            status: TaskStatus::Backlog,
            priority: Priority::Medium,
            labels: vec![],
            assignee: Assignee::Josh,
            created_at: now,
            updated_at: now,
            due_date: None,
            order: 0,
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["taskNumber"], "MC-1");
        assert_eq!(value["assignee"], "josh");
        assert!(value["dueDate"].is_null());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent_due_date() {
        let absent: TaskPatch = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(absent.due_date, None);

        let cleared: TaskPatch = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: TaskPatch = serde_json::from_str(r#"{"dueDate": "2025-03-01"}"#).unwrap();
        assert_eq!(set.due_date, Some(Some("2025-03-01".to_string())));
    }

    #[test]
    fn test_patch_ignores_immutable_fields() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"id": "other", "taskNumber": "MC-99", "order": 2}"#).unwrap();
        assert_eq!(patch.order, Some(2));
        assert!(patch.title.is_none());
    }

    #[test]
    fn test_meta_default_starts_at_one() {
        assert_eq!(Meta::default().next_task_number, 1);
    }
}
