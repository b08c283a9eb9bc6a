//! vt login/logout/whoami command implementations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session;
use crate::storage::Storage;

/// Options for `vt login`
pub struct LoginOptions {
    pub email: String,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `vt logout`
pub struct LogoutOptions {
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `vt whoami`
pub struct WhoamiOptions {
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct SessionReport {
    user_id: String,
    email: String,
    signed_in_at: DateTime<Utc>,
    active_task_id: Option<String>,
    home: PathBuf,
}

#[derive(serde::Serialize)]
struct LogoutReport {
    signed_out: bool,
}

pub fn run_login(options: LoginOptions) -> Result<()> {
    let storage = Storage::resolve(options.home.as_deref());
    let session = session::sign_in(&storage, &options.email, Utc::now())?;

    let report = SessionReport {
        user_id: session.user_id.clone(),
        email: session.email.clone(),
        signed_in_at: session.signed_in_at,
        active_task_id: session.active_task_id.clone(),
        home: storage.home().to_path_buf(),
    };

    let mut human = HumanOutput::new(format!("Signed in as {}", session.email));
    human.push_summary("User", session.user_id.clone());
    human.push_summary("Home", storage.home().display().to_string());
    human.push_next_step("vt task new \"<title>\"");

    emit_success(options.output, "login", &report, Some(&human))
}

pub fn run_logout(options: LogoutOptions) -> Result<()> {
    let storage = Storage::resolve(options.home.as_deref());
    let signed_out = session::sign_out(&storage)?;

    let human = HumanOutput::new(if signed_out {
        "Signed out"
    } else {
        "Not signed in"
    });
    emit_success(
        options.output,
        "logout",
        &LogoutReport { signed_out },
        Some(&human),
    )
}

pub fn run_whoami(options: WhoamiOptions) -> Result<()> {
    let storage = Storage::resolve(options.home.as_deref());
    let session = session::require_session(&storage)?;

    let report = SessionReport {
        user_id: session.user_id.clone(),
        email: session.email.clone(),
        signed_in_at: session.signed_in_at,
        active_task_id: session.active_task_id.clone(),
        home: storage.home().to_path_buf(),
    };

    let mut human = HumanOutput::new(session.email.clone());
    human.push_summary("User", session.user_id.clone());
    human.push_summary("Signed in", session.signed_in_at.to_rfc3339());
    if let Some(active) = session.active_task_id.as_deref() {
        human.push_summary("Active task", active.to_string());
    }

    emit_success(options.output, "whoami", &report, Some(&human))
}
