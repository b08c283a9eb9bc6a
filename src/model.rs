//! Task and project records plus the input types that create and change them.
//!
//! Records serialize with camelCase keys; the same shape is used by the file
//! store and by the export envelope, so timestamps always travel as RFC 3339
//! strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TITLE_MAX_CHARS: usize = 100;
pub const PROJECT_NAME_MAX_CHARS: usize = 50;
pub const DEFAULT_PROJECT_COLOR: &str = "#3b82f6";

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    New,
    Active,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::New,
        TaskStatus::Active,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Rank used when sorting lists by status (higher sorts first descending).
    pub fn sort_rank(&self) -> u8 {
        match self {
            TaskStatus::Active => 4,
            TaskStatus::New => 3,
            TaskStatus::Completed => 2,
            TaskStatus::Cancelled => 1,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(TaskStatus::New),
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(Error::validation(
                "status",
                format!("unknown status '{other}' (expected new|active|completed|cancelled)"),
            )),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn sort_rank(&self) -> u8 {
        match self {
            TaskPriority::High => 3,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 1,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(Error::validation(
                "priority",
                format!("unknown priority '{other}' (expected low|medium|high)"),
            )),
        }
    }
}

/// One status a task occupied and, once closed, how long it lasted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: TaskStatus,
    pub changed_at: DateTime<Utc>,
    /// Minutes spent in `status`; filled in by the following transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in_status: Option<u64>,
}

impl StatusHistoryEntry {
    pub fn open(status: TaskStatus, changed_at: DateTime<Utc>) -> Self {
        Self {
            status,
            changed_at,
            time_in_status: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.time_in_status.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
}

impl Task {
    /// Build a fresh task in status `new` with its seeded history entry.
    pub fn new(id: impl Into<String>, data: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: data.title,
            description: data.description,
            priority: data.priority,
            status: TaskStatus::New,
            estimated_time: data.estimated_time,
            actual_time: None,
            project_id: data.project_id,
            is_archived: false,
            created_at: now,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            status_history: crate::history::new_task_history(now),
        }
    }

    pub fn last_history_entry(&self) -> Option<&StatusHistoryEntry> {
        self.status_history.last()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, data: NewProject, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: data.name,
            description: data.description,
            color: data
                .color
                .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
            is_archived: false,
            board_url: data.board_url,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub estimated_time: Option<u64>,
    pub project_id: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority,
            estimated_time: None,
            project_id: None,
        }
    }

    /// Check schema constraints and return the normalized input.
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            title: validate_title(&self.title)?,
            description: normalize_text(self.description),
            priority: self.priority,
            estimated_time: self.estimated_time.map(validate_estimated_time).transpose()?,
            project_id: self.project_id.map(|id| validate_reference(&id)).transpose()?,
        })
    }
}

/// Field changes for an existing task. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub estimated_time: Option<Option<u64>>,
    pub status: Option<TaskStatus>,
    pub project_id: Option<Option<String>>,
    pub archived: Option<bool>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.estimated_time.is_none()
            && self.status.is_none()
            && self.project_id.is_none()
            && self.archived.is_none()
    }

    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            title: self.title.map(|title| validate_title(&title)).transpose()?,
            description: self.description.map(normalize_text),
            priority: self.priority,
            estimated_time: self
                .estimated_time
                .map(|value| value.map(validate_estimated_time).transpose())
                .transpose()?,
            status: self.status,
            project_id: self
                .project_id
                .map(|value| value.map(|id| validate_reference(&id)).transpose())
                .transpose()?,
            archived: self.archived,
        })
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub board_url: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            name: validate_project_name(&self.name)?,
            description: normalize_text(self.description),
            color: self.color.map(|color| validate_color(&color)).transpose()?,
            board_url: self
                .board_url
                .map(|url| validate_board_url(&url))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub board_url: Option<Option<String>>,
    pub archived: Option<bool>,
}

impl ProjectUpdate {
    pub fn archived(archived: bool) -> Self {
        Self {
            archived: Some(archived),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.board_url.is_none()
            && self.archived.is_none()
    }

    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            name: self
                .name
                .map(|name| validate_project_name(&name))
                .transpose()?,
            description: self.description.map(normalize_text),
            color: self.color.map(|color| validate_color(&color)).transpose()?,
            board_url: self
                .board_url
                .map(|value| value.map(|url| validate_board_url(&url)).transpose())
                .transpose()?,
            archived: self.archived,
        })
    }
}

pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("title", "title is required"));
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(Error::validation(
            "title",
            format!("title must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_estimated_time(minutes: u64) -> Result<u64> {
    if minutes == 0 {
        return Err(Error::validation(
            "estimatedTime",
            "estimated time must be greater than 0",
        ));
    }
    Ok(minutes)
}

pub fn validate_project_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("name", "project name is required"));
    }
    if trimmed.chars().count() > PROJECT_NAME_MAX_CHARS {
        return Err(Error::validation(
            "name",
            format!("project name must be at most {PROJECT_NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_color(color: &str) -> Result<String> {
    let trimmed = color.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|ch| ch.is_ascii_hexdigit());
    if !valid {
        return Err(Error::validation(
            "color",
            format!("'{trimmed}' is not a hex color like #3b82f6"),
        ));
    }
    Ok(trimmed.to_ascii_lowercase())
}

pub fn validate_board_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let has_host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(Error::validation(
            "boardUrl",
            "board URL must start with http:// or https://",
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_reference(id: &str) -> Result<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("projectId", "project id cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
