//! Command-line interface for vt
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::session::{self, Session};
use crate::storage::{FileStore, Storage};

mod auth;
mod project;
mod task;
mod transfer;

/// vt - VeraTasks personal task tracker
///
/// Track tasks through new, active, completed and cancelled, group them in
/// projects, and export or import them as JSON.
#[derive(Parser, Debug)]
#[command(name = "vt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding config, session and task data
    #[arg(long, global = true, env = "VERATASKS_HOME")]
    pub home: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in (registers the email on first use)
    Login {
        /// Email address
        email: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    New {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high (defaults to tasks.default_priority)
        #[arg(short, long)]
        priority: Option<String>,

        /// Estimated time in minutes
        #[arg(short, long)]
        estimate: Option<u64>,

        /// Project id or unique prefix
        #[arg(long)]
        project: Option<String>,
    },

    /// List tasks
    List {
        /// Case-insensitive text to find in title or description
        #[arg(short, long)]
        search: Option<String>,

        /// Only tasks with this status
        #[arg(long)]
        status: Option<String>,

        /// Only tasks with this priority
        #[arg(long)]
        priority: Option<String>,

        /// Only tasks in this project (`none` for tasks without one)
        #[arg(long)]
        project: Option<String>,

        /// Include archived tasks
        #[arg(long)]
        archived: bool,

        /// Sort key: created, title, priority, status
        #[arg(long)]
        sort: Option<String>,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
    },

    /// Show one task with its status history
    Show {
        /// Task id or unique prefix
        id: String,
    },

    /// Change task fields
    Edit {
        /// Task id or unique prefix
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,

        #[arg(short, long)]
        priority: Option<String>,

        /// Estimated time in minutes
        #[arg(short, long, conflicts_with = "clear_estimate")]
        estimate: Option<u64>,

        #[arg(long)]
        clear_estimate: bool,

        /// Status: new, active, completed, cancelled
        #[arg(long)]
        status: Option<String>,

        /// Project id or prefix (`none` detaches the task)
        #[arg(long)]
        project: Option<String>,
    },

    /// Start working on a task (pauses the current one)
    Start {
        /// Task id or unique prefix
        id: String,
    },

    /// Send a task back to new
    Pause {
        /// Task id or unique prefix
        id: String,
    },

    /// Mark a task completed
    Complete {
        /// Task id or unique prefix
        id: String,
    },

    /// Mark a task cancelled
    Cancel {
        /// Task id or unique prefix
        id: String,
    },

    /// Hide a task from default listings
    Archive {
        /// Task id or unique prefix
        id: String,
    },

    /// Restore an archived task
    Unarchive {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete a task permanently
    Delete {
        /// Task id or unique prefix
        id: String,
    },

    /// Show the active task
    Active,

    /// Task statistics
    Stats {
        /// Limit to one project (id or unique prefix)
        #[arg(long)]
        project: Option<String>,
    },

    /// Export all tasks as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import tasks from an export file
    Import {
        /// Export file (`-` for stdin)
        file: PathBuf,

        /// Delete every existing task first and keep imported ids
        #[arg(long)]
        replace: bool,
    },

    /// Delete every task
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    New {
        /// Project name
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Hex color like #3b82f6 (defaults to projects.default_color)
        #[arg(short, long)]
        color: Option<String>,

        /// External board URL
        #[arg(long)]
        board_url: Option<String>,
    },

    /// List projects
    List {
        /// List archived projects instead
        #[arg(long)]
        archived: bool,
    },

    /// Show one project with its task counts
    Show {
        /// Project id or unique prefix
        id: String,
    },

    /// Change project fields
    Edit {
        /// Project id or unique prefix
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,

        #[arg(short, long)]
        color: Option<String>,

        #[arg(long, conflicts_with = "clear_board_url")]
        board_url: Option<String>,

        #[arg(long)]
        clear_board_url: bool,
    },

    /// Archive a project
    Archive {
        /// Project id or unique prefix
        id: String,
    },

    /// Restore an archived project
    Unarchive {
        /// Project id or unique prefix
        id: String,
    },

    /// Delete a project (its tasks are kept and detached)
    Delete {
        /// Project id or unique prefix
        id: String,
    },
}

/// Everything a data command needs: the store for the signed-in user, their
/// session and the loaded config.
pub(crate) struct UserContext {
    pub storage: Storage,
    pub config: Config,
    pub session: Session,
    pub store: FileStore,
}

impl UserContext {
    pub fn load(home: Option<PathBuf>) -> Result<Self> {
        let storage = Storage::resolve(home.as_deref());
        let config = Config::load_from_home(storage.home())?;
        let session = session::require_session(&storage)?;
        let store = FileStore::open(&storage, &session.user_id)?;
        tracing::debug!(home = %storage.home().display(), user_id = %session.user_id, "loaded context");
        Ok(Self {
            storage,
            config,
            session,
            store,
        })
    }

    /// Persist the session if the command changed it.
    pub fn save_session_if_changed(&self, before: &Session) -> Result<()> {
        if &self.session != before {
            session::save_session(&self.storage, &self.session)?;
        }
        Ok(())
    }
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let home = self.home;

        match self.command {
            Commands::Login { email } => auth::run_login(auth::LoginOptions {
                email,
                home,
                output,
            }),
            Commands::Logout => auth::run_logout(auth::LogoutOptions { home, output }),
            Commands::Whoami => auth::run_whoami(auth::WhoamiOptions { home, output }),
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    description,
                    priority,
                    estimate,
                    project,
                } => task::run_new(task::NewOptions {
                    title,
                    description,
                    priority,
                    estimate,
                    project,
                    home,
                    output,
                }),
                TaskCommands::List {
                    search,
                    status,
                    priority,
                    project,
                    archived,
                    sort,
                    asc,
                } => task::run_list(task::ListOptions {
                    search,
                    status,
                    priority,
                    project,
                    archived,
                    sort,
                    asc,
                    home,
                    output,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, home, output }),
                TaskCommands::Edit {
                    id,
                    title,
                    description,
                    clear_description,
                    priority,
                    estimate,
                    clear_estimate,
                    status,
                    project,
                } => task::run_edit(task::EditOptions {
                    id,
                    title,
                    description,
                    clear_description,
                    priority,
                    estimate,
                    clear_estimate,
                    status,
                    project,
                    home,
                    output,
                }),
                TaskCommands::Start { id } => task::run_transition(task::TransitionOptions {
                    id,
                    action: task::TransitionAction::Start,
                    home,
                    output,
                }),
                TaskCommands::Pause { id } => task::run_transition(task::TransitionOptions {
                    id,
                    action: task::TransitionAction::Pause,
                    home,
                    output,
                }),
                TaskCommands::Complete { id } => task::run_transition(task::TransitionOptions {
                    id,
                    action: task::TransitionAction::Complete,
                    home,
                    output,
                }),
                TaskCommands::Cancel { id } => task::run_transition(task::TransitionOptions {
                    id,
                    action: task::TransitionAction::Cancel,
                    home,
                    output,
                }),
                TaskCommands::Archive { id } => task::run_archive(task::ArchiveOptions {
                    id,
                    archived: true,
                    home,
                    output,
                }),
                TaskCommands::Unarchive { id } => task::run_archive(task::ArchiveOptions {
                    id,
                    archived: false,
                    home,
                    output,
                }),
                TaskCommands::Delete { id } => {
                    task::run_delete(task::DeleteOptions { id, home, output })
                }
                TaskCommands::Active => task::run_active(task::ActiveOptions { home, output }),
                TaskCommands::Stats { project } => task::run_stats(task::StatsOptions {
                    project,
                    home,
                    output,
                }),
                TaskCommands::Export { output: path } => {
                    transfer::run_export(transfer::ExportOptions { path, home, output })
                }
                TaskCommands::Import { file, replace } => {
                    transfer::run_import(transfer::ImportOptions {
                        file,
                        replace,
                        home,
                        output,
                    })
                }
                TaskCommands::Clear { yes } => {
                    transfer::run_clear(transfer::ClearOptions { yes, home, output })
                }
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New {
                    name,
                    description,
                    color,
                    board_url,
                } => project::run_new(project::NewOptions {
                    name,
                    description,
                    color,
                    board_url,
                    home,
                    output,
                }),
                ProjectCommands::List { archived } => project::run_list(project::ListOptions {
                    archived,
                    home,
                    output,
                }),
                ProjectCommands::Show { id } => {
                    project::run_show(project::ShowOptions { id, home, output })
                }
                ProjectCommands::Edit {
                    id,
                    name,
                    description,
                    clear_description,
                    color,
                    board_url,
                    clear_board_url,
                } => project::run_edit(project::EditOptions {
                    id,
                    name,
                    description,
                    clear_description,
                    color,
                    board_url,
                    clear_board_url,
                    home,
                    output,
                }),
                ProjectCommands::Archive { id } => project::run_archive(project::ArchiveOptions {
                    id,
                    archived: true,
                    home,
                    output,
                }),
                ProjectCommands::Unarchive { id } => {
                    project::run_archive(project::ArchiveOptions {
                        id,
                        archived: false,
                        home,
                        output,
                    })
                }
                ProjectCommands::Delete { id } => {
                    project::run_delete(project::DeleteOptions { id, home, output })
                }
            },
        }
    }
}
