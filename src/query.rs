//! Filtering, sorting and id lookup for task and project lists.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::{Project, Task, TaskPriority, TaskStatus};

/// Which project a task must belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProjectFilter {
    #[default]
    Any,
    /// Tasks without a project.
    Unassigned,
    Project(String),
}

impl ProjectFilter {
    /// `none` selects tasks without a project; anything else is an id.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("none") {
            ProjectFilter::Unassigned
        } else {
            ProjectFilter::Project(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project: ProjectFilter,
    pub include_archived: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if task.is_archived && !self.include_archived {
            return false;
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() {
                let in_title = task.title.to_lowercase().contains(&needle);
                let in_description = task
                    .description
                    .as_deref()
                    .is_some_and(|description| description.to_lowercase().contains(&needle));
                if !in_title && !in_description {
                    return false;
                }
            }
        }
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        match &self.project {
            ProjectFilter::Any => true,
            ProjectFilter::Unassigned => task.project_id.is_none(),
            ProjectFilter::Project(id) => task.project_id.as_deref() == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Created,
    Title,
    Priority,
    Status,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Created => "created",
            SortKey::Title => "title",
            SortKey::Priority => "priority",
            SortKey::Status => "status",
        }
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::Created => a.created_at.cmp(&b.created_at),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Priority => a.priority.sort_rank().cmp(&b.priority.sort_rank()),
            SortKey::Status => a.status.sort_rank().cmp(&b.status.sort_rank()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(SortKey::Created),
            "title" => Ok(SortKey::Title),
            "priority" => Ok(SortKey::Priority),
            "status" => Ok(SortKey::Status),
            other => Err(Error::validation(
                "sort",
                format!("unknown sort key '{other}' (expected created|title|priority|status)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(Error::validation(
                "direction",
                format!("unknown sort direction '{other}' (expected asc|desc)"),
            )),
        }
    }
}

/// Filter then sort. Ties keep their input order.
pub fn filter_and_sort(
    tasks: Vec<Task>,
    filter: &TaskFilter,
    key: SortKey,
    direction: SortDirection,
) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks.into_iter().filter(|task| filter.matches(task)).collect();
    selected.sort_by(|a, b| match direction {
        SortDirection::Asc => key.compare(a, b),
        SortDirection::Desc => key.compare(b, a),
    });
    selected
}

/// Resolve a full id or unique id prefix to a task id.
pub fn resolve_task_id(tasks: &[Task], input: &str) -> Result<String> {
    resolve_prefix(tasks.iter().map(|task| task.id.as_str()), input, "task")
        .and_then(|found| found.ok_or_else(|| Error::TaskNotFound(input.trim().to_string())))
}

/// Resolve a full id or unique id prefix to a project id.
pub fn resolve_project_id(projects: &[Project], input: &str) -> Result<String> {
    resolve_prefix(projects.iter().map(|project| project.id.as_str()), input, "project")
        .and_then(|found| found.ok_or_else(|| Error::ProjectNotFound(input.trim().to_string())))
}

fn resolve_prefix<'a>(
    ids: impl Iterator<Item = &'a str>,
    input: &str,
    noun: &str,
) -> Result<Option<String>> {
    let trimmed = input.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{noun} id cannot be empty")));
    }

    let mut matches: Vec<&str> = Vec::new();
    for id in ids {
        let normalized = id.to_ascii_lowercase();
        if normalized == trimmed {
            return Ok(Some(id.to_string()));
        }
        if normalized.starts_with(&trimmed) {
            matches.push(id);
        }
    }

    matches.sort_unstable();
    matches.dedup();
    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some((*only).to_string())),
        many => Err(Error::InvalidArgument(format!(
            "ambiguous {noun} id '{}': {}",
            input.trim(),
            many.join(", ")
        ))),
    }
}
