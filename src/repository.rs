//! Storage interfaces for tasks and projects.
//!
//! Every method may fail with a transport-class error; callers surface it and
//! never retry. Implementations own exactly one user's partition.

use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{Project, Task};

/// Task storage operations.
pub trait TaskRepository {
    /// All tasks, newest `createdAt` first.
    fn list_tasks(&self) -> Result<Vec<Task>>;

    fn get_task(&self, id: &str) -> Result<Option<Task>>;

    /// Insert a task together with its history. Fails if the id exists.
    fn insert_task(&self, task: &Task) -> Result<()>;

    /// Replace a stored task (fields and history). `TaskNotFound` if absent.
    fn update_task(&self, task: &Task) -> Result<()>;

    /// Remove a task and its history. Returns whether it existed.
    fn delete_task(&self, id: &str) -> Result<bool>;

    /// Remove every task in the partition. Returns how many were removed.
    fn delete_all_tasks(&self) -> Result<usize>;

    /// Null out `projectId` on every task referencing `project_id`.
    fn clear_project_reference(&self, project_id: &str) -> Result<usize>;
}

/// Project storage operations.
pub trait ProjectRepository {
    /// All projects, newest `createdAt` first.
    fn list_projects(&self) -> Result<Vec<Project>>;

    fn get_project(&self, id: &str) -> Result<Option<Project>>;

    fn insert_project(&self, project: &Project) -> Result<()>;

    fn update_project(&self, project: &Project) -> Result<()>;

    fn delete_project(&self, id: &str) -> Result<bool>;
}

pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub(crate) fn sort_projects_newest_first(projects: &mut [Project]) {
    projects.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub(crate) fn insert_unique_task(tasks: &mut Vec<Task>, task: &Task) -> Result<()> {
    if tasks.iter().any(|existing| existing.id == task.id) {
        return Err(Error::InvalidArgument(format!(
            "task already exists: {}",
            task.id
        )));
    }
    tasks.push(task.clone());
    Ok(())
}

pub(crate) fn replace_task(tasks: &mut [Task], task: &Task) -> Result<()> {
    let slot = tasks
        .iter_mut()
        .find(|existing| existing.id == task.id)
        .ok_or_else(|| Error::TaskNotFound(task.id.clone()))?;
    *slot = task.clone();
    Ok(())
}

pub(crate) fn clear_reference(tasks: &mut [Task], project_id: &str) -> usize {
    let mut cleared = 0;
    for task in tasks
        .iter_mut()
        .filter(|task| task.project_id.as_deref() == Some(project_id))
    {
        task.project_id = None;
        cleared += 1;
    }
    cleared
}

pub(crate) fn insert_unique_project(projects: &mut Vec<Project>, project: &Project) -> Result<()> {
    if projects.iter().any(|existing| existing.id == project.id) {
        return Err(Error::InvalidArgument(format!(
            "project already exists: {}",
            project.id
        )));
    }
    projects.push(project.clone());
    Ok(())
}

pub(crate) fn replace_project(projects: &mut [Project], project: &Project) -> Result<()> {
    let slot = projects
        .iter_mut()
        .find(|existing| existing.id == project.id)
        .ok_or_else(|| Error::ProjectNotFound(project.id.clone()))?;
    *slot = project.clone();
    Ok(())
}

/// In-memory partition for tests and embedding.
///
/// Writes can be made to fail after a budget is spent, which lets callers
/// exercise transport failures in the middle of multi-step operations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
    projects: Mutex<Vec<Project>>,
    write_budget: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `writes` more successful writes; every later write fails.
    pub fn fail_after_writes(&self, writes: usize) {
        if let Ok(mut budget) = self.write_budget.lock() {
            *budget = Some(writes);
        }
    }

    /// Lift any write budget set by `fail_after_writes`.
    pub fn restore_writes(&self) {
        if let Ok(mut budget) = self.write_budget.lock() {
            *budget = None;
        }
    }

    fn tasks(&self) -> Result<MutexGuard<'_, Vec<Task>>> {
        self.tasks
            .lock()
            .map_err(|_| Error::Transport("task store poisoned".to_string()))
    }

    fn projects(&self) -> Result<MutexGuard<'_, Vec<Project>>> {
        self.projects
            .lock()
            .map_err(|_| Error::Transport("project store poisoned".to_string()))
    }

    fn spend_write(&self) -> Result<()> {
        let mut budget = self
            .write_budget
            .lock()
            .map_err(|_| Error::Transport("write budget poisoned".to_string()))?;
        match budget.as_mut() {
            None => Ok(()),
            Some(0) => Err(Error::Transport("store unavailable".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
        }
    }
}

impl TaskRepository for MemoryStore {
    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.tasks()?.clone();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.tasks()?.iter().find(|task| task.id == id).cloned())
    }

    fn insert_task(&self, task: &Task) -> Result<()> {
        self.spend_write()?;
        let mut tasks = self.tasks()?;
        insert_unique_task(&mut tasks, task)
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        self.spend_write()?;
        let mut tasks = self.tasks()?;
        replace_task(&mut tasks, task)
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        self.spend_write()?;
        let mut tasks = self.tasks()?;
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        Ok(tasks.len() != before)
    }

    fn delete_all_tasks(&self) -> Result<usize> {
        self.spend_write()?;
        let mut tasks = self.tasks()?;
        let removed = tasks.len();
        tasks.clear();
        Ok(removed)
    }

    fn clear_project_reference(&self, project_id: &str) -> Result<usize> {
        self.spend_write()?;
        let mut tasks = self.tasks()?;
        Ok(clear_reference(&mut tasks, project_id))
    }
}

impl ProjectRepository for MemoryStore {
    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = self.projects()?.clone();
        sort_projects_newest_first(&mut projects);
        Ok(projects)
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        Ok(self
            .projects()?
            .iter()
            .find(|project| project.id == id)
            .cloned())
    }

    fn insert_project(&self, project: &Project) -> Result<()> {
        self.spend_write()?;
        let mut projects = self.projects()?;
        insert_unique_project(&mut projects, project)
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        self.spend_write()?;
        let mut projects = self.projects()?;
        replace_project(&mut projects, project)
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        self.spend_write()?;
        let mut projects = self.projects()?;
        let before = projects.len();
        projects.retain(|project| project.id != id);
        Ok(projects.len() != before)
    }
}
