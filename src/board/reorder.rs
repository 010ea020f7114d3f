//! Drag-and-drop placement within a status column.
//!
//! Instead of fractional orders, a move rewrites the `order` of every task in
//! the destination column to its index. Columns hold tens of tasks, so the
//! extra writes are irrelevant.

use super::models::{ReorderUpdate, Task, TaskStatus};

/// Plan the batch of updates that places `task_id` at `index` within
/// `target`.
///
/// Siblings are the other tasks already in `target`, sorted by their current
/// `order` with ties kept in array position. An index past the end appends.
/// Returns `None` when `task_id` is not in `tasks`.
pub fn plan_move(
    tasks: &[Task],
    task_id: &str,
    target: TaskStatus,
    index: usize,
) -> Option<Vec<ReorderUpdate>> {
    if !tasks.iter().any(|t| t.id == task_id) {
        return None;
    }

    let mut column: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status == target && t.id != task_id)
        .collect();
    column.sort_by_key(|t| t.order);

    let mut ids: Vec<&str> = column.iter().map(|t| t.id.as_str()).collect();
    ids.insert(index.min(ids.len()), task_id);

    Some(
        ids.into_iter()
            .enumerate()
            .map(|(position, id)| ReorderUpdate {
                id: id.to_string(),
                status: target,
                order: position as i64,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::models::{Assignee, Priority};
    use chrono::Utc;

    fn task(id: &str, status: TaskStatus, order: i64) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            task_number: String::new(),
            title: id.to_uppercase(),
            description: String::new(),
            status,
            priority: Priority::Medium,
            labels: vec![],
            assignee: Assignee::Josh,
            created_at: now,
            updated_at: now,
            due_date: None,
            order,
        }
    }

    fn ids(plan: &[ReorderUpdate]) -> Vec<&str> {
        plan.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn test_move_into_middle_of_other_column() {
        let tasks = vec![
            task("a", TaskStatus::Todo, 0),
            task("b", TaskStatus::Todo, 1),
            task("c", TaskStatus::Todo, 2),
            task("x", TaskStatus::Backlog, 0),
        ];
        let plan = plan_move(&tasks, "x", TaskStatus::Todo, 1).unwrap();
        assert_eq!(ids(&plan), vec!["a", "x", "b", "c"]);
        for (i, u) in plan.iter().enumerate() {
            assert_eq!(u.order, i as i64);
            assert_eq!(u.status, TaskStatus::Todo);
        }
    }

    #[test]
    fn test_reorder_within_same_column() {
        let tasks = vec![
            task("a", TaskStatus::Todo, 0),
            task("b", TaskStatus::Todo, 1),
            task("c", TaskStatus::Todo, 2),
        ];
        let plan = plan_move(&tasks, "c", TaskStatus::Todo, 0).unwrap();
        assert_eq!(ids(&plan), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_siblings_sorted_by_order_not_array_position() {
        let tasks = vec![
            task("late", TaskStatus::Review, 9),
            task("early", TaskStatus::Review, 2),
            task("m", TaskStatus::Done, 0),
        ];
        let plan = plan_move(&tasks, "m", TaskStatus::Review, 5).unwrap();
        assert_eq!(ids(&plan), vec!["early", "late", "m"]);
    }

    #[test]
    fn test_gaps_collapse_and_ties_keep_array_position() {
        let tasks = vec![
            task("first", TaskStatus::Todo, 4),
            task("second", TaskStatus::Todo, 4),
            task("new", TaskStatus::Backlog, 0),
        ];
        let plan = plan_move(&tasks, "new", TaskStatus::Todo, 0).unwrap();
        assert_eq!(ids(&plan), vec!["new", "first", "second"]);
        assert_eq!(plan.last().unwrap().order, 2);
    }

    #[test]
    fn test_move_into_empty_column() {
        let tasks = vec![task("a", TaskStatus::Todo, 3)];
        let plan = plan_move(&tasks, "a", TaskStatus::Archived, 7).unwrap();
        assert_eq!(plan, vec![ReorderUpdate {
            id: "a".into(),
            status: TaskStatus::Archived,
            order: 0,
        }]);
    }

    #[test]
    fn test_unknown_task_yields_none() {
        let tasks = vec![task("a", TaskStatus::Todo, 0)];
        assert!(plan_move(&tasks, "zzz", TaskStatus::Todo, 0).is_none());
    }
}
