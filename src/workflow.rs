//! Task workflow: create, edit and move tasks through their statuses.
//!
//! Every mutation persists through the repository and then re-reads the task
//! from it, so callers always see what the store holds. The active-task
//! pointer lives in the caller's [`Session`]; at most one task is tracked as
//! active per session.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::history::record_transition;
use crate::model::{NewTask, Task, TaskStatus, TaskUpdate};
use crate::repository::{ProjectRepository, TaskRepository};
use crate::session::Session;

/// Source of "now" for timestamps and durations.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct TaskWorkflow<'a> {
    tasks: &'a dyn TaskRepository,
    projects: &'a dyn ProjectRepository,
    clock: &'a dyn Clock,
}

impl<'a> TaskWorkflow<'a> {
    pub fn new(
        tasks: &'a dyn TaskRepository,
        projects: &'a dyn ProjectRepository,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            tasks,
            projects,
            clock,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.tasks.get_task(id)
    }

    /// All tasks, newest first.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.tasks.list_tasks()
    }

    pub fn get_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .list_tasks()?
            .into_iter()
            .filter(|task| task.status == status)
            .collect())
    }

    /// The task the session tracks as active, if it still exists.
    pub fn active_task(&self, session: &Session) -> Result<Option<Task>> {
        match session.active_task_id.as_deref() {
            Some(id) => self.tasks.get_task(id),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn create_task(&self, data: NewTask) -> Result<Task> {
        let data = data.validated()?;
        if let Some(project_id) = data.project_id.as_deref() {
            self.ensure_project(project_id)?;
        }

        let task = Task::new(Uuid::new_v4().to_string(), data, self.clock.now());
        self.tasks.insert_task(&task)?;
        tracing::info!(task_id = %task.id, "created task");
        self.reload(&task.id)
    }

    /// Apply field changes and, when the status changes, record the
    /// transition.
    ///
    /// Moving a task to `active` this way follows the same rule as
    /// [`start_task`](Self::start_task). Moving the tracked task anywhere
    /// else clears the pointer.
    pub fn update_task(&self, session: &mut Session, id: &str, update: TaskUpdate) -> Result<Task> {
        let mut task = self.load(id)?;
        let update = update.validated()?;
        if let Some(Some(project_id)) = update.project_id.as_ref() {
            self.ensure_project(project_id)?;
        }

        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(estimated_time) = update.estimated_time {
            task.estimated_time = estimated_time;
        }
        if let Some(project_id) = update.project_id {
            task.project_id = project_id;
        }
        if let Some(archived) = update.archived {
            task.is_archived = archived;
        }

        if let Some(status) = update.status {
            if status == TaskStatus::Active {
                self.pause_previous_active(session, id)?;
            }
            task = record_transition(task, status, self.clock.now());
        }

        self.tasks.update_task(&task)?;
        match update.status {
            Some(TaskStatus::Active) => session.set_active(id),
            Some(_) => {
                session.clear_active_if(id);
            }
            None => {}
        }
        tracing::debug!(task_id = %id, status = %task.status, "updated task");
        self.reload(id)
    }

    /// Permanently remove a task and its history.
    pub fn delete_task(&self, session: &mut Session, id: &str) -> Result<()> {
        if !self.tasks.delete_task(id)? {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        session.clear_active_if(id);
        tracing::info!(task_id = %id, "deleted task");
        Ok(())
    }

    /// Make `id` the active task, pausing the previously active one.
    pub fn start_task(&self, session: &mut Session, id: &str) -> Result<Task> {
        let target = self.load(id)?;
        self.pause_previous_active(session, id)?;
        let task = self.transition(target, TaskStatus::Active)?;
        session.set_active(id);
        Ok(task)
    }

    pub fn pause_task(&self, session: &mut Session, id: &str) -> Result<Task> {
        let task = self.transition(self.load(id)?, TaskStatus::New)?;
        session.clear_active_if(id);
        Ok(task)
    }

    pub fn complete_task(&self, session: &mut Session, id: &str) -> Result<Task> {
        let task = self.transition(self.load(id)?, TaskStatus::Completed)?;
        session.clear_active_if(id);
        Ok(task)
    }

    pub fn cancel_task(&self, session: &mut Session, id: &str) -> Result<Task> {
        let task = self.transition(self.load(id)?, TaskStatus::Cancelled)?;
        session.clear_active_if(id);
        Ok(task)
    }

    pub fn archive_task(&self, id: &str) -> Result<Task> {
        self.set_archived(id, true)
    }

    pub fn unarchive_task(&self, id: &str) -> Result<Task> {
        self.set_archived(id, false)
    }

    /// Delete every task in the partition. Returns how many were removed.
    pub fn clear_all_tasks(&self, session: &mut Session) -> Result<usize> {
        let removed = self.tasks.delete_all_tasks()?;
        session.clear_active();
        tracing::info!(removed, "cleared all tasks");
        Ok(removed)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn load(&self, id: &str) -> Result<Task> {
        self.tasks
            .get_task(id)?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    fn reload(&self, id: &str) -> Result<Task> {
        self.load(id)
    }

    fn ensure_project(&self, project_id: &str) -> Result<()> {
        match self.projects.get_project(project_id)? {
            Some(_) => Ok(()),
            None => Err(Error::ProjectNotFound(project_id.to_string())),
        }
    }

    fn transition(&self, task: Task, status: TaskStatus) -> Result<Task> {
        let id = task.id.clone();
        let from = task.status;
        let updated = record_transition(task, status, self.clock.now());
        if updated.status != from {
            self.tasks.update_task(&updated)?;
            tracing::debug!(task_id = %id, from = %from, to = %status, "status changed");
        }
        self.reload(&id)
    }

    /// Send the tracked task back to `new` if it is some other task that is
    /// still active.
    fn pause_previous_active(&self, session: &mut Session, next_id: &str) -> Result<()> {
        let Some(previous_id) = session.active_task_id.clone() else {
            return Ok(());
        };
        if previous_id == next_id {
            return Ok(());
        }
        match self.tasks.get_task(&previous_id)? {
            Some(previous) if previous.status == TaskStatus::Active => {
                self.transition(previous, TaskStatus::New)?;
            }
            _ => {}
        }
        session.clear_active();
        Ok(())
    }

    fn set_archived(&self, id: &str, archived: bool) -> Result<Task> {
        let mut task = self.load(id)?;
        if task.is_archived != archived {
            task.is_archived = archived;
            self.tasks.update_task(&task)?;
        }
        self.reload(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{closed_minutes, elapsed_minutes, is_well_formed};
    use crate::model::{NewProject, Project, TaskPriority};
    use crate::repository::MemoryStore;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn session() -> Session {
        Session::new("u1", "ana@example.com", base_time())
    }

    fn active_count(workflow: &TaskWorkflow<'_>) -> usize {
        workflow
            .get_tasks_by_status(TaskStatus::Active)
            .expect("list")
            .len()
    }

    #[test]
    fn write_report_scenario() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let report = workflow
            .create_task(NewTask::new("Write report", TaskPriority::High))
            .expect("create");
        assert_eq!(report.status, TaskStatus::New);
        assert_eq!(report.status_history.len(), 1);
        assert_eq!(report.status_history[0].status, TaskStatus::New);

        clock.advance(Duration::minutes(2));
        let report = workflow.start_task(&mut session, &report.id).expect("start");
        assert_eq!(report.status, TaskStatus::Active);
        assert_eq!(report.started_at, Some(clock.now()));
        assert!(session.is_active(&report.id));

        let review = workflow
            .create_task(NewTask::new("Review notes", TaskPriority::Low))
            .expect("create");
        clock.advance(Duration::minutes(25));
        let review = workflow.start_task(&mut session, &review.id).expect("start second");
        assert!(session.is_active(&review.id));

        let report = workflow.get_task(&report.id).expect("get").expect("report");
        assert_eq!(report.status, TaskStatus::New);
        let active_entry = &report.status_history[1];
        assert_eq!(active_entry.status, TaskStatus::Active);
        assert_eq!(active_entry.time_in_status, Some(25));

        clock.advance(Duration::minutes(40));
        let review = workflow.complete_task(&mut session, &review.id).expect("complete");
        assert_eq!(review.status, TaskStatus::Completed);
        assert_eq!(review.completed_at, Some(clock.now()));
        let started_at = review.started_at.expect("started");
        assert_eq!(review.actual_time, Some(elapsed_minutes(started_at, clock.now())));
        assert_eq!(review.actual_time, Some(40));
        assert_eq!(session.active_task_id, None);
    }

    #[test]
    fn at_most_one_task_is_active() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let ids: Vec<String> = (0..3)
            .map(|n| {
                workflow
                    .create_task(NewTask::new(format!("task {n}"), TaskPriority::Medium))
                    .expect("create")
                    .id
            })
            .collect();

        for id in ids.iter().chain(ids.iter().rev()) {
            clock.advance(Duration::minutes(3));
            workflow.start_task(&mut session, id).expect("start");
            assert_eq!(active_count(&workflow), 1);
            assert!(session.is_active(id));
        }

        clock.advance(Duration::minutes(1));
        workflow.pause_task(&mut session, &ids[0]).expect("pause");
        assert_eq!(active_count(&workflow), 0);
        assert_eq!(session.active_task_id, None);

        for task in workflow.list_tasks().expect("list") {
            assert!(is_well_formed(&task.status_history));
            let open_since = task.last_history_entry().expect("entry").changed_at;
            assert_eq!(
                closed_minutes(&task.status_history),
                elapsed_minutes(task.created_at, open_since)
            );
        }
    }

    #[test]
    fn starting_the_active_task_again_is_idempotent() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let task = workflow
            .create_task(NewTask::new("Focus", TaskPriority::High))
            .expect("create");
        let first = workflow.start_task(&mut session, &task.id).expect("start");
        clock.advance(Duration::minutes(10));
        let second = workflow.start_task(&mut session, &task.id).expect("start again");
        assert_eq!(first, second);
        assert!(session.is_active(&task.id));
    }

    #[test]
    fn restarting_keeps_original_start_time() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let task = workflow
            .create_task(NewTask::new("Long haul", TaskPriority::Low))
            .expect("create");
        workflow.start_task(&mut session, &task.id).expect("start");
        let first_start = clock.now();
        clock.advance(Duration::minutes(30));
        workflow.pause_task(&mut session, &task.id).expect("pause");
        clock.advance(Duration::minutes(60));
        workflow.start_task(&mut session, &task.id).expect("restart");
        clock.advance(Duration::minutes(15));
        let done = workflow.complete_task(&mut session, &task.id).expect("complete");

        assert_eq!(done.started_at, Some(first_start));
        assert_eq!(done.actual_time, Some(105));
    }

    #[test]
    fn update_status_follows_active_rules() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let a = workflow.create_task(NewTask::new("a", TaskPriority::Low)).expect("a");
        let b = workflow.create_task(NewTask::new("b", TaskPriority::Low)).expect("b");
        workflow.start_task(&mut session, &a.id).expect("start a");

        let b = workflow
            .update_task(&mut session, &b.id, TaskUpdate::status(TaskStatus::Active))
            .expect("activate b");
        assert_eq!(b.status, TaskStatus::Active);
        assert!(session.is_active(&b.id));
        assert_eq!(active_count(&workflow), 1);

        workflow
            .update_task(&mut session, &b.id, TaskUpdate::status(TaskStatus::Cancelled))
            .expect("cancel b");
        assert_eq!(session.active_task_id, None);
    }

    #[test]
    fn update_applies_field_changes_and_clears_optionals() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let mut data = NewTask::new("Draft", TaskPriority::Low);
        data.description = Some("first pass".to_string());
        data.estimated_time = Some(30);
        let task = workflow.create_task(data).expect("create");

        let update = TaskUpdate {
            title: Some("Final draft".to_string()),
            description: Some(None),
            priority: Some(TaskPriority::High),
            estimated_time: Some(None),
            ..TaskUpdate::default()
        };
        let task = workflow.update_task(&mut session, &task.id, update).expect("update");
        assert_eq!(task.title, "Final draft");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.estimated_time, None);
        assert_eq!(task.status_history.len(), 1);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let err = workflow
            .update_task(&mut session, "ghost", TaskUpdate::status(TaskStatus::Completed))
            .expect_err("missing");
        assert!(matches!(err, Error::TaskNotFound(_)));
        assert!(matches!(
            workflow.delete_task(&mut session, "ghost"),
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            workflow.start_task(&mut session, "ghost"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn create_requires_existing_project() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);

        let mut data = NewTask::new("Paint fence", TaskPriority::Medium);
        data.project_id = Some("p1".to_string());
        let err = workflow.create_task(data.clone()).expect_err("no project");
        assert!(matches!(err, Error::ProjectNotFound(_)));

        store
            .insert_project(&Project::new("p1", NewProject::new("Home"), base_time()))
            .expect("project");
        let task = workflow.create_task(data).expect("create");
        assert_eq!(task.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn delete_clears_pointer() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let task = workflow.create_task(NewTask::new("Temp", TaskPriority::Low)).expect("create");
        workflow.start_task(&mut session, &task.id).expect("start");
        workflow.delete_task(&mut session, &task.id).expect("delete");
        assert_eq!(session.active_task_id, None);
        assert_eq!(workflow.get_task(&task.id).expect("get"), None);
        assert_eq!(workflow.active_task(&session).expect("active"), None);
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let task = workflow.create_task(NewTask::new("Flaky", TaskPriority::Low)).expect("create");
        store.fail_after_writes(0);
        let err = workflow.start_task(&mut session, &task.id).expect_err("offline");
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(session.active_task_id, None);

        let stored = workflow.get_task(&task.id).expect("get").expect("task");
        assert_eq!(stored.status, TaskStatus::New);
    }

    #[test]
    fn archive_toggles_flag_only() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);

        let task = workflow.create_task(NewTask::new("Old", TaskPriority::Low)).expect("create");
        let archived = workflow.archive_task(&task.id).expect("archive");
        assert!(archived.is_archived);
        assert_eq!(archived.status, TaskStatus::New);
        assert!(!workflow.unarchive_task(&task.id).expect("unarchive").is_archived);
    }

    #[test]
    fn clear_all_removes_everything() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = session();

        let task = workflow.create_task(NewTask::new("one", TaskPriority::Low)).expect("one");
        workflow.create_task(NewTask::new("two", TaskPriority::Low)).expect("two");
        workflow.start_task(&mut session, &task.id).expect("start");

        assert_eq!(workflow.clear_all_tasks(&mut session).expect("clear"), 2);
        assert!(workflow.list_tasks().expect("list").is_empty());
        assert_eq!(session.active_task_id, None);
    }
}
