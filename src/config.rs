//! Configuration loading and management
//!
//! Handles parsing of `<home>/veratasks.toml`. Every key is optional; a
//! missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{validate_color, TaskPriority, DEFAULT_PROJECT_COLOR};
use crate::query::{SortDirection, SortKey};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Project defaults
    #[serde(default)]
    pub projects: ProjectsConfig,

    /// Export formatting
    #[serde(default)]
    pub export: ExportConfig,
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Priority for `task new` when none is given
    #[serde(default = "default_priority")]
    pub default_priority: String,
    /// Sort key for `task list`
    #[serde(default = "default_sort")]
    pub default_sort: String,
    /// Sort direction for `task list`
    #[serde(default = "default_direction")]
    pub default_direction: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

fn default_sort() -> String {
    "created".to_string()
}

fn default_direction() -> String {
    "desc".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
            default_sort: default_sort(),
            default_direction: default_direction(),
        }
    }
}

impl TasksConfig {
    pub fn priority(&self) -> Result<TaskPriority> {
        self.default_priority
            .parse()
            .map_err(|_| invalid("tasks.default_priority", &self.default_priority, "low|medium|high"))
    }

    pub fn sort(&self) -> Result<SortKey> {
        self.default_sort.parse().map_err(|_| {
            invalid("tasks.default_sort", &self.default_sort, "created|title|priority|status")
        })
    }

    pub fn direction(&self) -> Result<SortDirection> {
        self.default_direction
            .parse()
            .map_err(|_| invalid("tasks.default_direction", &self.default_direction, "asc|desc"))
    }

    fn validate(&self) -> Result<()> {
        self.priority()?;
        self.sort()?;
        self.direction()?;
        Ok(())
    }
}

/// Projects configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Color for `project new` when none is given
    #[serde(default = "default_color")]
    pub default_color: String,
}

fn default_color() -> String {
    DEFAULT_PROJECT_COLOR.to_string()
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            default_color: default_color(),
        }
    }
}

impl ProjectsConfig {
    fn validate(&self) -> Result<()> {
        validate_color(&self.default_color).map_err(|_| {
            invalid("projects.default_color", &self.default_color, "a hex color like #3b82f6")
        })?;
        Ok(())
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Pretty-print export files
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

fn invalid(field: &str, value: &str, expected: &str) -> Error {
    Error::InvalidConfig(format!("{field}: invalid value '{value}' (expected {expected})"))
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `veratasks.toml` from `home`, or return defaults when absent
    pub fn load_from_home(home: &Path) -> Result<Self> {
        let config_path = home.join("veratasks.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        self.tasks.validate()?;
        self.projects.validate()?;
        Ok(())
    }
}
