//! Project management.
//!
//! Projects group tasks by reference only. Deleting a project detaches its
//! tasks (their `projectId` is cleared) and never deletes them.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{NewProject, Project, ProjectUpdate};
use crate::repository::{ProjectRepository, TaskRepository};
use crate::stats::{calculate_project_stats, ProjectStats};
use crate::workflow::Clock;

/// Outcome of deleting a project
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDeletion {
    pub project: Project,
    /// Tasks whose `projectId` was cleared
    pub detached_tasks: usize,
}

pub struct ProjectService<'a> {
    projects: &'a dyn ProjectRepository,
    tasks: &'a dyn TaskRepository,
    clock: &'a dyn Clock,
}

impl<'a> ProjectService<'a> {
    pub fn new(
        projects: &'a dyn ProjectRepository,
        tasks: &'a dyn TaskRepository,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            projects,
            tasks,
            clock,
        }
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.projects.get_project(id)
    }

    /// Non-archived projects, newest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self
            .projects
            .list_projects()?
            .into_iter()
            .filter(|project| !project.is_archived)
            .collect())
    }

    /// Archived projects, most recently changed first.
    pub fn list_archived_projects(&self) -> Result<Vec<Project>> {
        let mut archived: Vec<Project> = self
            .projects
            .list_projects()?
            .into_iter()
            .filter(|project| project.is_archived)
            .collect();
        archived.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(archived)
    }

    pub fn create_project(&self, data: NewProject) -> Result<Project> {
        let data = data.validated()?;
        let project = Project::new(Uuid::new_v4().to_string(), data, self.clock.now());
        self.projects.insert_project(&project)?;
        tracing::info!(project_id = %project.id, "created project");
        self.reload(&project.id)
    }

    pub fn update_project(&self, id: &str, update: ProjectUpdate) -> Result<Project> {
        let mut project = self.load(id)?;
        let update = update.validated()?;

        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(description) = update.description {
            project.description = description;
        }
        if let Some(color) = update.color {
            project.color = color;
        }
        if let Some(board_url) = update.board_url {
            project.board_url = board_url;
        }
        if let Some(archived) = update.archived {
            project.is_archived = archived;
        }
        project.updated_at = self.clock.now();

        self.projects.update_project(&project)?;
        tracing::debug!(project_id = %id, "updated project");
        self.reload(id)
    }

    pub fn archive_project(&self, id: &str) -> Result<Project> {
        self.update_project(id, ProjectUpdate::archived(true))
    }

    pub fn unarchive_project(&self, id: &str) -> Result<Project> {
        self.update_project(id, ProjectUpdate::archived(false))
    }

    /// Detach every task from the project, then delete it.
    pub fn delete_project(&self, id: &str) -> Result<ProjectDeletion> {
        let project = self.load(id)?;
        let detached_tasks = self.tasks.clear_project_reference(id)?;
        if !self.projects.delete_project(id)? {
            return Err(Error::ProjectNotFound(id.to_string()));
        }
        tracing::info!(project_id = %id, detached_tasks, "deleted project");
        Ok(ProjectDeletion {
            project,
            detached_tasks,
        })
    }

    pub fn project_stats(&self, id: &str) -> Result<ProjectStats> {
        self.load(id)?;
        Ok(calculate_project_stats(id, &self.tasks.list_tasks()?))
    }

    fn load(&self, id: &str) -> Result<Project> {
        self.projects
            .get_project(id)?
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))
    }

    fn reload(&self, id: &str) -> Result<Project> {
        self.load(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, TaskPriority, DEFAULT_PROJECT_COLOR};
    use crate::repository::MemoryStore;
    use crate::workflow::{ManualClock, TaskWorkflow};
    use chrono::{DateTime, Duration, Utc};

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn create_applies_default_color() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let service = ProjectService::new(&store, &store, &clock);

        let project = service.create_project(NewProject::new("Home")).expect("create");
        assert_eq!(project.color, DEFAULT_PROJECT_COLOR);
        assert!(!project.is_archived);
        assert_eq!(project.created_at, project.updated_at);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let service = ProjectService::new(&store, &store, &clock);

        let mut data = NewProject::new("Home");
        data.color = Some("blue".to_string());
        assert!(matches!(
            service.create_project(data),
            Err(Error::Validation { ref field, .. }) if field == "color"
        ));
        assert!(service.create_project(NewProject::new("  ")).is_err());
        assert!(service.list_projects().expect("list").is_empty());
    }

    #[test]
    fn archive_moves_between_lists() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let service = ProjectService::new(&store, &store, &clock);

        let project = service.create_project(NewProject::new("Garden")).expect("create");
        clock.advance(Duration::minutes(5));
        let archived = service.archive_project(&project.id).expect("archive");
        assert!(archived.is_archived);
        assert_eq!(archived.updated_at, clock.now());
        assert!(service.list_projects().expect("active").is_empty());
        assert_eq!(service.list_archived_projects().expect("archived").len(), 1);

        service.unarchive_project(&project.id).expect("unarchive");
        assert_eq!(service.list_projects().expect("active").len(), 1);
    }

    #[test]
    fn delete_detaches_tasks_without_deleting_them() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let service = ProjectService::new(&store, &store, &clock);
        let workflow = TaskWorkflow::new(&store, &store, &clock);

        let project = service.create_project(NewProject::new("Home")).expect("create");
        let mut data = NewTask::new("Paint fence", TaskPriority::Medium);
        data.project_id = Some(project.id.clone());
        let task = workflow.create_task(data).expect("task");
        workflow
            .create_task(NewTask::new("Unrelated", TaskPriority::Low))
            .expect("other");

        let deletion = service.delete_project(&project.id).expect("delete");
        assert_eq!(deletion.detached_tasks, 1);
        assert_eq!(service.get_project(&project.id).expect("get"), None);

        let task = workflow.get_task(&task.id).expect("get").expect("kept");
        assert_eq!(task.project_id, None);
        assert_eq!(workflow.list_tasks().expect("list").len(), 2);

        assert!(matches!(
            service.delete_project(&project.id),
            Err(Error::ProjectNotFound(_))
        ));
    }

    #[test]
    fn stats_count_only_project_tasks() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(base_time());
        let service = ProjectService::new(&store, &store, &clock);
        let workflow = TaskWorkflow::new(&store, &store, &clock);
        let mut session = crate::session::Session::new("u1", "ana@example.com", base_time());

        let project = service.create_project(NewProject::new("Home")).expect("create");
        for title in ["a", "b"] {
            let mut data = NewTask::new(title, TaskPriority::Low);
            data.project_id = Some(project.id.clone());
            let task = workflow.create_task(data).expect("task");
            if title == "a" {
                workflow.complete_task(&mut session, &task.id).expect("complete");
            }
        }
        workflow
            .create_task(NewTask::new("outside", TaskPriority::Low))
            .expect("other");

        let stats = service.project_stats(&project.id).expect("stats");
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.completion_rate, 50.0);
    }
}
