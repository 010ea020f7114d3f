use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::events::{Broadcaster, EventKind};
use super::json_file::JsonTable;
use super::models::*;
use super::reorder;
use crate::errors::{BoardError, BoardResult};

/// Activity entries kept on disk; older ones are dropped.
pub const ACTIVITY_CAP: usize = 200;

/// Default page size for `list_activity`.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

pub const TASKS_FILE: &str = "tasks.json";
pub const ACTIVITY_FILE: &str = "activity.json";
pub const META_FILE: &str = "meta.json";
pub const BACKUPS_DIR: &str = "backups";

/// File-backed task board: tasks, their activity trail and the display
/// number counter.
pub struct TaskStore {
    tasks: JsonTable<Vec<Task>>,
    activity: JsonTable<Vec<Activity>>,
    meta: JsonTable<Meta>,
    backups_dir: PathBuf,
    prefix: String,
    events: Arc<dyn Broadcaster>,
}

impl TaskStore {
    /// Open (or initialise) the task files under `data_dir`.
    pub fn open(data_dir: &Path, prefix: &str, events: Arc<dyn Broadcaster>) -> Result<Self> {
        let backups_dir = data_dir.join(BACKUPS_DIR);
        std::fs::create_dir_all(&backups_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let store = Self {
            tasks: JsonTable::open(data_dir.join(TASKS_FILE))?,
            activity: JsonTable::open(data_dir.join(ACTIVITY_FILE))?,
            meta: JsonTable::open(data_dir.join(META_FILE))?,
            backups_dir,
            prefix: prefix.to_string(),
            events,
        };
        store
            .backfill_numbers()
            .context("Failed to backfill task numbers")?;
        Ok(store)
    }

    fn format_number(&self, n: u64) -> String {
        format!("{}-{}", self.prefix, n)
    }

    fn parse_number(&self, number: &str) -> Option<u64> {
        number
            .strip_prefix(&self.prefix)?
            .strip_prefix('-')?
            .parse()
            .ok()
    }

    /// Give legacy tasks a display number and move the counter past every
    /// number already handed out.
    fn backfill_numbers(&self) -> BoardResult<()> {
        let (highest, missing) = self.tasks.read(|tasks| {
            let highest = tasks
                .iter()
                .filter_map(|t| self.parse_number(&t.task_number))
                .max()
                .unwrap_or(0);
            let missing = tasks.iter().filter(|t| t.task_number.is_empty()).count() as u64;
            (highest, missing)
        })?;

        let first = self.meta.mutate(|meta| {
            meta.next_task_number = meta.next_task_number.max(highest + 1);
            let first = meta.next_task_number;
            meta.next_task_number += missing;
            Ok(first)
        })?;

        if missing > 0 {
            self.tasks.mutate(|tasks| {
                let mut next = first;
                for task in tasks.iter_mut().filter(|t| t.task_number.is_empty()) {
                    task.task_number = self.format_number(next);
                    next += 1;
                }
                Ok(())
            })?;
            tracing::info!(count = missing, "assigned display numbers to legacy tasks");
        }
        Ok(())
    }

    /// Reserve the next display number. Numbers are burned even if the
    /// caller later fails, so they are never reused.
    fn allocate_number(&self) -> BoardResult<String> {
        let n = self.meta.mutate(|meta| {
            let n = meta.next_task_number;
            meta.next_task_number += 1;
            Ok(n)
        })?;
        Ok(self.format_number(n))
    }

    fn log_activity(&self, entries: Vec<Activity>) -> BoardResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.activity.mutate(|log| {
            for entry in entries {
                log.insert(0, entry);
            }
            log.truncate(ACTIVITY_CAP);
            Ok(())
        })
    }

    fn activity(action: ActivityAction, title: &str, details: impl Into<String>) -> Activity {
        Activity {
            id: Uuid::new_v4().to_string(),
            action,
            task_title: title.to_string(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    fn moved_details(from: TaskStatus, to: TaskStatus) -> String {
        format!("{} → {}", from, to)
    }

    /// Copy the task file to `backups/tasks-YYYY-MM-DD.json` once per day.
    fn backup_daily(&self) {
        let today = Utc::now().format("%Y-%m-%d");
        let target = self.backups_dir.join(format!("tasks-{}.json", today));
        if target.exists() {
            return;
        }
        if let Err(e) = std::fs::copy(self.tasks.path(), &target) {
            tracing::debug!(path = %target.display(), error = %e, "daily task backup skipped");
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn list(&self, status: Option<TaskStatus>) -> BoardResult<Vec<Task>> {
        self.backup_daily();
        self.tasks.read(|tasks| {
            tasks
                .iter()
                .filter(|t| status.is_none_or(|s| t.status == s))
                .cloned()
                .collect()
        })
    }

    /// The first `limit` tasks in file order, without the backup side effect.
    pub fn peek(&self, limit: usize) -> BoardResult<Vec<Task>> {
        self.tasks
            .read(|tasks| tasks.iter().take(limit).cloned().collect())
    }

    pub fn get(&self, id: &str) -> BoardResult<Task> {
        self.tasks
            .read(|tasks| tasks.iter().find(|t| t.id == id).cloned())?
            .ok_or_else(|| BoardError::task_not_found(id))
    }

    /// Most recent activity first.
    pub fn list_activity(&self, limit: usize) -> BoardResult<Vec<Activity>> {
        self.activity
            .read(|log| log.iter().take(limit).cloned().collect())
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn create(&self, fields: NewTask) -> BoardResult<Task> {
        let task_number = self.allocate_number()?;
        let now = Utc::now();
        let status = fields.status.unwrap_or_default();

        let task = self.tasks.mutate(|tasks| {
            let order = fields
                .order
                .unwrap_or_else(|| tasks.iter().filter(|t| t.status == status).count() as i64);
            let task = Task {
                id: Uuid::new_v4().to_string(),
                task_number,
                title: fields
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "Untitled".to_string()),
                description: fields.description.unwrap_or_default(),
                status,
                priority: fields.priority.unwrap_or_default(),
                labels: fields.labels.unwrap_or_default(),
                assignee: fields.assignee.unwrap_or_default(),
                created_at: now,
                updated_at: now,
                due_date: fields.due_date,
                order,
            };
            tasks.push(task.clone());
            Ok(task)
        })?;

        self.log_activity(vec![Self::activity(
            ActivityAction::Created,
            &task.title,
            format!("Created in {}", task.status),
        )])?;
        self.events.broadcast(EventKind::TaskCreated, json!(task));
        Ok(task)
    }

    pub fn update(&self, id: &str, patch: TaskPatch) -> BoardResult<Task> {
        let (old_status, task) = self.tasks.mutate(|tasks| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| BoardError::task_not_found(id))?;
            let old_status = task.status;

            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(labels) = patch.labels {
                task.labels = labels;
            }
            if let Some(assignee) = patch.assignee {
                task.assignee = assignee;
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = due_date;
            }
            if let Some(order) = patch.order {
                task.order = order;
            }
            task.updated_at = Utc::now();
            Ok((old_status, task.clone()))
        })?;

        if old_status != task.status {
            self.log_activity(vec![Self::activity(
                ActivityAction::Moved,
                &task.title,
                Self::moved_details(old_status, task.status),
            )])?;
            self.events.broadcast(EventKind::TaskMoved, json!(task));
        } else {
            self.log_activity(vec![Self::activity(
                ActivityAction::Updated,
                &task.title,
                "Task updated",
            )])?;
            self.events.broadcast(EventKind::TaskUpdated, json!(task));
        }
        Ok(task)
    }

    pub fn delete(&self, id: &str) -> BoardResult<()> {
        let task = self.tasks.mutate(|tasks| {
            let idx = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| BoardError::task_not_found(id))?;
            Ok(tasks.remove(idx))
        })?;

        self.log_activity(vec![Self::activity(
            ActivityAction::Deleted,
            &task.title,
            "Task deleted",
        )])?;
        self.events.broadcast(
            EventKind::TaskDeleted,
            json!({"id": task.id, "title": task.title}),
        );
        Ok(())
    }

    /// Apply a batch of placements in one write. Unknown ids are skipped and
    /// a repeated id takes the last entry. Returns how many entries applied.
    pub fn reorder(&self, updates: &[ReorderUpdate]) -> BoardResult<usize> {
        let now = Utc::now();
        let (applied, moves) = self.tasks.mutate(|tasks| {
            let mut applied = 0;
            let mut moves = Vec::new();
            for update in updates {
                let Some(task) = tasks.iter_mut().find(|t| t.id == update.id) else {
                    continue;
                };
                if task.status != update.status {
                    moves.push(Self::activity(
                        ActivityAction::Moved,
                        &task.title,
                        Self::moved_details(task.status, update.status),
                    ));
                }
                task.status = update.status;
                task.order = update.order;
                task.updated_at = now;
                applied += 1;
            }
            Ok((applied, moves))
        })?;

        self.log_activity(moves)?;
        self.events.broadcast(
            EventKind::TasksReordered,
            json!({"reorder": true, "updates": updates}),
        );
        Ok(applied)
    }

    /// Place a task at `index` within `status`, renumbering the column.
    pub fn move_to(
        &self,
        id: &str,
        status: TaskStatus,
        index: usize,
    ) -> BoardResult<Vec<ReorderUpdate>> {
        let plan = self
            .tasks
            .read(|tasks| reorder::plan_move(tasks, id, status, index))?
            .ok_or_else(|| BoardError::task_not_found(id))?;
        self.reorder(&plan)?;
        Ok(plan)
    }

    /// Replace every task with freshly numbered records built from `drafts`,
    /// keeping each draft's order. Used by the markdown importer.
    pub fn replace_all(&self, drafts: Vec<NewTask>) -> BoardResult<Vec<Task>> {
        let now = Utc::now();
        let mut imported = Vec::with_capacity(drafts.len());
        for draft in drafts {
            imported.push(Task {
                id: Uuid::new_v4().to_string(),
                task_number: self.allocate_number()?,
                title: draft.title.unwrap_or_else(|| "Untitled".to_string()),
                description: draft.description.unwrap_or_default(),
                status: draft.status.unwrap_or_default(),
                priority: draft.priority.unwrap_or_default(),
                labels: draft.labels.unwrap_or_default(),
                assignee: draft.assignee.unwrap_or_default(),
                created_at: now,
                updated_at: now,
                due_date: draft.due_date,
                order: draft.order.unwrap_or(0),
            });
        }
        self.tasks.mutate(|tasks| {
            *tasks = imported.clone();
            Ok(())
        })?;
        Ok(imported)
    }
}
