//! Aggregate statistics over a task list.
//!
//! Everything here is a pure function of its input and is recomputed on every
//! read; nothing is cached or persisted.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Sum of `actualTime` over completed tasks, in minutes.
    pub active_time: u64,
    pub average_completion_time: f64,
    /// Percentage in `[0, 100]`.
    pub completion_rate: f64,
    pub status_distribution: BTreeMap<TaskStatus, usize>,
    pub priority_distribution: BTreeMap<TaskPriority, usize>,
    pub average_time_in_status: BTreeMap<TaskStatus, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub project_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub active_tasks: usize,
    pub completion_rate: f64,
}

pub fn calculate_task_stats(tasks: &[Task]) -> TaskStats {
    let total_tasks = tasks.len();
    let completed: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Completed)
        .collect();

    let active_time = completed
        .iter()
        .map(|task| task.actual_time.unwrap_or(0))
        .sum();

    let timed: Vec<u64> = completed.iter().filter_map(|task| task.actual_time).collect();

    let mut status_distribution: BTreeMap<TaskStatus, usize> =
        TaskStatus::ALL.iter().map(|status| (*status, 0)).collect();
    let mut priority_distribution: BTreeMap<TaskPriority, usize> =
        TaskPriority::ALL.iter().map(|priority| (*priority, 0)).collect();
    for task in tasks {
        *status_distribution.entry(task.status).or_default() += 1;
        *priority_distribution.entry(task.priority).or_default() += 1;
    }

    TaskStats {
        total_tasks,
        completed_tasks: completed.len(),
        active_time,
        average_completion_time: mean(&timed),
        completion_rate: rate(completed.len(), total_tasks),
        status_distribution,
        priority_distribution,
        average_time_in_status: average_time_in_status(tasks),
    }
}

/// Mean recorded `timeInStatus` per status across every history entry.
fn average_time_in_status(tasks: &[Task]) -> BTreeMap<TaskStatus, f64> {
    let mut samples: BTreeMap<TaskStatus, Vec<u64>> = TaskStatus::ALL
        .iter()
        .map(|status| (*status, Vec::new()))
        .collect();

    for entry in tasks.iter().flat_map(|task| task.status_history.iter()) {
        if let Some(minutes) = entry.time_in_status {
            samples.entry(entry.status).or_default().push(minutes);
        }
    }

    samples
        .into_iter()
        .map(|(status, minutes)| (status, mean(&minutes)))
        .collect()
}

pub fn calculate_project_stats(project_id: &str, tasks: &[Task]) -> ProjectStats {
    let in_project: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.project_id.as_deref() == Some(project_id))
        .collect();
    let count = |status: TaskStatus| in_project.iter().filter(|task| task.status == status).count();
    let completed_tasks = count(TaskStatus::Completed);

    ProjectStats {
        project_id: project_id.to_string(),
        total_tasks: in_project.len(),
        completed_tasks,
        active_tasks: count(TaskStatus::Active),
        completion_rate: rate(completed_tasks, in_project.len()),
    }
}

/// Render minutes as `45m`, `2h` or `2h 5m`.
pub fn format_duration(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {rest}m")
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
