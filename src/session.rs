//! Signed-in user and the active-task pointer.
//!
//! The session is plain client-side state persisted in `<home>/session.json`.
//! Operations that need a partition resolve it through [`require_session`];
//! workflow operations receive it as `&mut Session` and the caller saves it
//! afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_task_id: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            signed_in_at: now,
            active_task_id: None,
        }
    }

    pub fn is_active(&self, task_id: &str) -> bool {
        self.active_task_id.as_deref() == Some(task_id)
    }

    pub fn set_active(&mut self, task_id: impl Into<String>) {
        self.active_task_id = Some(task_id.into());
    }

    /// Clear the pointer only when it names `task_id`.
    pub fn clear_active_if(&mut self, task_id: &str) -> bool {
        if self.is_active(task_id) {
            self.active_task_id = None;
            true
        } else {
            false
        }
    }

    pub fn clear_active(&mut self) {
        self.active_task_id = None;
    }
}

/// Normalize and sanity-check an email address.
///
/// Only the shape is checked: one `@`, a non-empty local part and a dotted
/// domain.
pub fn validate_email(email: &str) -> Result<String> {
    let trimmed = email.trim();
    let invalid = || Error::validation("email", format!("'{trimmed}' is not a valid email address"));

    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || trimmed.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Load the persisted session, if any.
pub fn load_session(storage: &Storage) -> Result<Option<Session>> {
    let path = storage.session_file();
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(storage.read_json(&path)?))
}

/// Load the persisted session or fail with `NotSignedIn`.
pub fn require_session(storage: &Storage) -> Result<Session> {
    load_session(storage)?.ok_or(Error::NotSignedIn)
}

pub fn save_session(storage: &Storage, session: &Session) -> Result<()> {
    storage.write_json(&storage.session_file(), session)
}

/// Sign in as `email`, registering the user on first sight.
///
/// Signing in again as the same user keeps the active-task pointer.
pub fn sign_in(storage: &Storage, email: &str, now: DateTime<Utc>) -> Result<Session> {
    let email = validate_email(email)?;
    let user = storage.resolve_user(&email, now)?;

    let mut session = Session::new(user.id, user.email, now);
    if let Some(previous) = load_session(storage)? {
        if previous.user_id == session.user_id {
            session.active_task_id = previous.active_task_id;
        }
    }

    save_session(storage, &session)?;
    tracing::info!(user_id = %session.user_id, "signed in");
    Ok(session)
}

/// Remove the session file. Returns whether a session existed.
pub fn sign_out(storage: &Storage) -> Result<bool> {
    let path = storage.session_file();
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    tracing::info!("signed out");
    Ok(true)
}
