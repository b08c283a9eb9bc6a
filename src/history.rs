//! Status history bookkeeping.
//!
//! A transition is two pure steps: close the entry that is currently open by
//! recording how long the task sat in it, then open an entry for the new
//! status. The task's own `startedAt`/`completedAt`/`cancelledAt` stamps and
//! the derived `actualTime` are updated alongside.

use chrono::{DateTime, Utc};

use crate::model::{StatusHistoryEntry, Task, TaskStatus};

/// Whole minutes between `from` and `to`, truncated toward zero.
///
/// Returns 0 when `to` precedes `from`.
pub fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_minutes().max(0) as u64
}

/// History of a freshly created task: a single open `new` entry.
pub fn new_task_history(now: DateTime<Utc>) -> Vec<StatusHistoryEntry> {
    vec![StatusHistoryEntry::open(TaskStatus::New, now)]
}

/// Fill in the duration of the last entry if it is still open.
pub fn close_current_entry(
    mut history: Vec<StatusHistoryEntry>,
    now: DateTime<Utc>,
) -> Vec<StatusHistoryEntry> {
    if let Some(last) = history.last_mut() {
        if last.time_in_status.is_none() {
            last.time_in_status = Some(elapsed_minutes(last.changed_at, now));
        }
    }
    history
}

/// Append an open entry for `status`.
pub fn open_entry(
    mut history: Vec<StatusHistoryEntry>,
    status: TaskStatus,
    now: DateTime<Utc>,
) -> Vec<StatusHistoryEntry> {
    history.push(StatusHistoryEntry::open(status, now));
    history
}

/// Move `task` to `new_status` at `now`, returning the updated task.
///
/// Returns the task unchanged when it already has `new_status`.
pub fn record_transition(task: Task, new_status: TaskStatus, now: DateTime<Utc>) -> Task {
    if task.status == new_status {
        return task;
    }

    let mut task = task;
    let history = std::mem::take(&mut task.status_history);
    task.status_history = open_entry(close_current_entry(history, now), new_status, now);
    task.status = new_status;

    match new_status {
        TaskStatus::Active => {
            if task.started_at.is_none() {
                task.started_at = Some(now);
            }
        }
        TaskStatus::Completed => {
            if task.completed_at.is_none() {
                task.completed_at = Some(now);
            }
            if let Some(started_at) = task.started_at {
                task.actual_time = Some(elapsed_minutes(started_at, now));
            }
        }
        TaskStatus::Cancelled => {
            if task.cancelled_at.is_none() {
                task.cancelled_at = Some(now);
            }
        }
        TaskStatus::New => {}
    }

    task
}

/// Sum of the recorded durations of every closed entry.
pub fn closed_minutes(history: &[StatusHistoryEntry]) -> u64 {
    history
        .iter()
        .filter_map(|entry| entry.time_in_status)
        .sum()
}

/// True when the history satisfies the ordering and open-entry invariants.
pub fn is_well_formed(history: &[StatusHistoryEntry]) -> bool {
    if history.is_empty() {
        return false;
    }
    let ordered = history
        .windows(2)
        .all(|pair| pair[0].changed_at <= pair[1].changed_at);
    let open_only_last = history[..history.len() - 1]
        .iter()
        .all(|entry| entry.time_in_status.is_some());
    ordered && open_only_last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, TaskPriority};
    use chrono::Duration;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn fresh_task(now: DateTime<Utc>) -> Task {
        Task::new("task-1", NewTask::new("Write report", TaskPriority::High), now)
    }

    #[test]
    fn elapsed_minutes_truncates_and_clamps() {
        let start = base_time();
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(119)), 1);
        assert_eq!(elapsed_minutes(start, start + Duration::minutes(90)), 90);
        assert_eq!(elapsed_minutes(start, start - Duration::minutes(5)), 0);
    }

    #[test]
    fn same_status_is_a_no_op() {
        let now = base_time();
        let task = fresh_task(now);
        let after = record_transition(task.clone(), TaskStatus::New, now + Duration::minutes(3));
        assert_eq!(after, task);
    }

    #[test]
    fn transition_closes_previous_entry_and_opens_new_one() {
        let now = base_time();
        let task = fresh_task(now);
        let later = now + Duration::minutes(12);
        let task = record_transition(task, TaskStatus::Active, later);

        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.status_history.len(), 2);
        assert_eq!(task.status_history[0].time_in_status, Some(12));
        assert_eq!(task.status_history[1].status, TaskStatus::Active);
        assert_eq!(task.status_history[1].changed_at, later);
        assert!(task.status_history[1].is_open());
        assert_eq!(task.started_at, Some(later));
    }

    #[test]
    fn restart_keeps_original_start_time() {
        let now = base_time();
        let task = fresh_task(now);
        let task = record_transition(task, TaskStatus::Active, now + Duration::minutes(5));
        let task = record_transition(task, TaskStatus::New, now + Duration::minutes(20));
        let task = record_transition(task, TaskStatus::Active, now + Duration::minutes(30));
        assert_eq!(task.started_at, Some(now + Duration::minutes(5)));

        let task = record_transition(task, TaskStatus::Completed, now + Duration::minutes(65));
        assert_eq!(task.actual_time, Some(60));
        assert_eq!(task.completed_at, Some(now + Duration::minutes(65)));
    }

    #[test]
    fn completion_without_start_leaves_actual_time_unset() {
        let now = base_time();
        let task = record_transition(fresh_task(now), TaskStatus::Completed, now + Duration::minutes(4));
        assert_eq!(task.actual_time, None);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn cancel_sets_cancelled_at_and_keeps_other_stamps() {
        let now = base_time();
        let task = record_transition(fresh_task(now), TaskStatus::Active, now + Duration::minutes(1));
        let task = record_transition(task, TaskStatus::Cancelled, now + Duration::minutes(2));
        assert_eq!(task.cancelled_at, Some(now + Duration::minutes(2)));
        assert_eq!(task.started_at, Some(now + Duration::minutes(1)));
    }

    #[test]
    fn closed_durations_cover_span_since_creation() {
        let now = base_time();
        let mut task = fresh_task(now);
        let steps = [
            (TaskStatus::Active, 7),
            (TaskStatus::New, 19),
            (TaskStatus::Active, 45),
            (TaskStatus::Completed, 80),
        ];
        for (status, minute) in steps {
            task = record_transition(task, status, now + Duration::minutes(minute));
            assert!(is_well_formed(&task.status_history));
        }
        assert_eq!(closed_minutes(&task.status_history), 80);
        assert!(task.status_history.last().expect("entry").is_open());
    }

    #[test]
    fn close_current_entry_keeps_existing_duration() {
        let now = base_time();
        let mut history = vec![StatusHistoryEntry::open(TaskStatus::New, now)];
        history[0].time_in_status = Some(3);
        let history = close_current_entry(history, now + Duration::minutes(50));
        assert_eq!(history[0].time_in_status, Some(3));
    }
}
