//! File-backed storage for VeraTasks
//!
//! Everything lives under a single home directory. Each signed-in user owns
//! one partition; nothing outside `users/<user-id>/` is ever read on their
//! behalf.
//!
//! # Directory Structure
//!
//! ```text
//! <home>/
//!   veratasks.toml              # Configuration
//!   session.json                # Signed-in user and active-task pointer
//!   users.json                  # Registry of known users (email -> id)
//!   users/
//!     <user-id>/
//!       tasks.json              # Tasks with embedded status history
//!       projects.json           # Projects
//! ```
//!
//! Collections are rewritten whole under a sidecar `.lock` file, using
//! temp-file + rename so readers never observe a partial document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{Project, Task};
use crate::repository::{self, ProjectRepository, TaskRepository};

/// Environment variable that overrides the home directory
pub const HOME_ENV: &str = "VERATASKS_HOME";

/// Home directory used when no platform data dir can be determined
pub const FALLBACK_HOME_DIR: &str = ".veratasks";

const STORE_SCHEMA_VERSION: &str = "vt.store.v1";

/// Path layout and JSON helpers for one home directory
#[derive(Debug, Clone)]
pub struct Storage {
    home: PathBuf,
}

impl Storage {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Pick the home directory: explicit path, then the platform data dir,
    /// then `./.veratasks`.
    ///
    /// `VERATASKS_HOME` is read by the CLI flag itself, so by the time this
    /// runs an explicit path already reflects it.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(home) = explicit {
            return Self::new(home);
        }
        match directories::ProjectDirs::from("dev", "veratasks", "veratasks") {
            Some(dirs) => Self::new(dirs.data_dir()),
            None => Self::new(FALLBACK_HOME_DIR),
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("veratasks.toml")
    }

    pub fn session_file(&self) -> PathBuf {
        self.home.join("session.json")
    }

    pub fn users_file(&self) -> PathBuf {
        self.home.join("users.json")
    }

    /// Partition directory for one user
    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.home.join("users").join(user_id)
    }

    pub fn tasks_file(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join("tasks.json")
    }

    pub fn projects_file(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join("projects.json")
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON atomically (temp file, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read JSON, falling back to `T::default()` when the file is absent
    pub fn read_json_or_default<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        self.read_json(path)
    }

    // =========================================================================
    // User registry (locked)
    // =========================================================================

    pub fn read_users(&self) -> Result<UsersRegistry> {
        self.read_json_or_default(&self.users_file())
    }

    /// Look up the user registered for `email`, registering a new id if needed.
    pub fn resolve_user(&self, email: &str, now: DateTime<Utc>) -> Result<UserEntry> {
        self.update_users(|registry| {
            if let Some(existing) = registry.find_by_email(email) {
                return Ok(existing.clone());
            }
            let entry = UserEntry {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                created_at: now,
            };
            tracing::info!(user_id = %entry.id, "registered new user");
            registry.users.push(entry.clone());
            Ok(entry)
        })
    }

    fn update_users<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UsersRegistry) -> Result<T>,
    {
        let path = self.users_file();
        lock::with_lock(lock_path(&path), DEFAULT_LOCK_TIMEOUT_MS, || {
            let mut registry: UsersRegistry = self.read_json_or_default(&path)?;
            let result = f(&mut registry)?;
            self.write_json(&path, &registry)?;
            Ok(result)
        })
    }
}

/// Registry of users known to this home directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersRegistry {
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

impl UsersRegistry {
    /// Emails compare case-insensitively.
    pub fn find_by_email(&self, email: &str) -> Option<&UserEntry> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TasksDocument {
    #[serde(default = "default_schema_version")]
    schema_version: String,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl Default for TasksDocument {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            tasks: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectsDocument {
    #[serde(default = "default_schema_version")]
    schema_version: String,
    #[serde(default)]
    projects: Vec<Project>,
}

impl Default for ProjectsDocument {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            projects: Vec::new(),
        }
    }
}

fn default_schema_version() -> String {
    STORE_SCHEMA_VERSION.to_string()
}

fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

/// One user's partition on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    storage: Storage,
    user_id: String,
}

impl FileStore {
    /// Open (creating if needed) the partition for `user_id`.
    pub fn open(storage: &Storage, user_id: &str) -> Result<Self> {
        if user_id.trim().is_empty() {
            return Err(Error::InvalidArgument("user id cannot be empty".to_string()));
        }
        fs::create_dir_all(storage.user_dir(user_id))?;
        Ok(Self {
            storage: storage.clone(),
            user_id: user_id.to_string(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        let doc: TasksDocument = self
            .storage
            .read_json_or_default(&self.storage.tasks_file(&self.user_id))?;
        Ok(doc.tasks)
    }

    fn load_projects(&self) -> Result<Vec<Project>> {
        let doc: ProjectsDocument = self
            .storage
            .read_json_or_default(&self.storage.projects_file(&self.user_id))?;
        Ok(doc.projects)
    }

    fn update_tasks<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<T>,
    {
        let path = self.storage.tasks_file(&self.user_id);
        lock::with_lock(lock_path(&path), DEFAULT_LOCK_TIMEOUT_MS, || {
            let mut doc: TasksDocument = self.storage.read_json_or_default(&path)?;
            let result = f(&mut doc.tasks)?;
            doc.schema_version = default_schema_version();
            self.storage.write_json(&path, &doc)?;
            tracing::debug!(user_id = %self.user_id, count = doc.tasks.len(), "wrote tasks");
            Ok(result)
        })
    }

    fn update_projects<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Project>) -> Result<T>,
    {
        let path = self.storage.projects_file(&self.user_id);
        lock::with_lock(lock_path(&path), DEFAULT_LOCK_TIMEOUT_MS, || {
            let mut doc: ProjectsDocument = self.storage.read_json_or_default(&path)?;
            let result = f(&mut doc.projects)?;
            doc.schema_version = default_schema_version();
            self.storage.write_json(&path, &doc)?;
            tracing::debug!(user_id = %self.user_id, count = doc.projects.len(), "wrote projects");
            Ok(result)
        })
    }
}

impl TaskRepository for FileStore {
    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.load_tasks()?;
        repository::sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.load_tasks()?.into_iter().find(|task| task.id == id))
    }

    fn insert_task(&self, task: &Task) -> Result<()> {
        self.update_tasks(|tasks| repository::insert_unique_task(tasks, task))
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        self.update_tasks(|tasks| repository::replace_task(tasks, task))
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        self.update_tasks(|tasks| {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            Ok(tasks.len() != before)
        })
    }

    fn delete_all_tasks(&self) -> Result<usize> {
        self.update_tasks(|tasks| {
            let removed = tasks.len();
            tasks.clear();
            Ok(removed)
        })
    }

    fn clear_project_reference(&self, project_id: &str) -> Result<usize> {
        self.update_tasks(|tasks| Ok(repository::clear_reference(tasks, project_id)))
    }
}

impl ProjectRepository for FileStore {
    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = self.load_projects()?;
        repository::sort_projects_newest_first(&mut projects);
        Ok(projects)
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        Ok(self
            .load_projects()?
            .into_iter()
            .find(|project| project.id == id))
    }

    fn insert_project(&self, project: &Project) -> Result<()> {
        self.update_projects(|projects| repository::insert_unique_project(projects, project))
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        self.update_projects(|projects| repository::replace_project(projects, project))
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        self.update_projects(|projects| {
            let before = projects.len();
            projects.retain(|project| project.id != id);
            Ok(projects.len() != before)
        })
    }
}
