//! VeraTasks - personal task tracking library
//!
//! This library provides the core functionality for the `vt` CLI.
//!
//! # Core Concepts
//!
//! - **Tasks**: titled work items moving through new, active, completed and
//!   cancelled, with a history of how long each status lasted
//! - **Active task**: at most one task per user is active; starting another
//!   pauses it
//! - **Projects**: optional grouping; deleting one detaches its tasks
//! - **Export/import**: a versioned JSON envelope, merged or replacing
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `veratasks.toml`
//! - `error`: Error types, kinds and exit codes
//! - `model`: Task and project records plus input validation
//! - `history`: Status history bookkeeping
//! - `repository`: Storage traits and an in-memory store
//! - `storage`: Data directory layout and the JSON file store
//! - `session`: Sign-in state and the active task pointer
//! - `workflow`: Task operations and status transitions
//! - `projects`: Project operations
//! - `query`: Filtering, sorting and id prefix lookup
//! - `stats`: Aggregate statistics
//! - `transfer`: JSON export and import
//! - `lock`: File locking and atomic writes

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod lock;
pub mod model;
pub mod output;
pub mod projects;
pub mod query;
pub mod repository;
pub mod session;
pub mod stats;
pub mod storage;
pub mod transfer;
pub mod workflow;

pub use error::{Error, Result};
