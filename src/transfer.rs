//! JSON export and import of a user's tasks.
//!
//! The export envelope is `{ "tasks": [...], "exportedAt": ..., "version":
//! "1.0.0" }`. Imports are parsed and checked in full before the store is
//! touched; a store failure part-way through an import leaves the tasks
//! already written in place and surfaces the error.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{StatusHistoryEntry, Task};
use crate::repository::{ProjectRepository, TaskRepository};
use crate::session::Session;

pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub tasks: Vec<Task>,
    /// Absent or unreadable values in imported files are tolerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ExportData {
    pub fn new(tasks: Vec<Task>, now: DateTime<Utc>) -> Self {
        Self {
            tasks,
            exported_at: Some(now),
            version: Some(EXPORT_VERSION.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Append every imported task under a fresh id.
    #[default]
    Merge,
    /// Delete all existing tasks, then insert the imported ones as-is.
    Replace,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Merge => f.write_str("merge"),
            ImportMode::Replace => f.write_str("replace"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "replace" => Ok(ImportMode::Replace),
            other => Err(Error::validation(
                "mode",
                format!("unknown import mode '{other}' (expected merge|replace)"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub mode: ImportMode,
    pub imported: usize,
    /// Tasks deleted before a replace import.
    pub removed: usize,
    /// Imported tasks whose project reference did not resolve and was cleared.
    pub detached: usize,
    /// Imported tasks that arrived without history and were given one.
    pub seeded_history: usize,
    pub task_ids: Vec<String>,
}

/// Serialize `tasks` in the export envelope, pretty-printed.
pub fn export_tasks(tasks: &[Task], now: DateTime<Utc>) -> Result<String> {
    render_export(&ExportData::new(tasks.to_vec(), now), true)
}

pub fn render_export(data: &ExportData, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(data)?
    } else {
        serde_json::to_string(data)?
    };
    Ok(text)
}

/// Decode an export document without touching any store.
pub fn parse_export(text: &str) -> Result<ExportData> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| Error::Format(format!("not valid JSON: {err}")))?;

    let items = match value.get("tasks") {
        Some(serde_json::Value::Array(items)) => items,
        Some(_) => return Err(Error::Format("`tasks` must be an array".to_string())),
        None => return Err(Error::Format("missing `tasks` array".to_string())),
    };

    let tasks = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<Task>(item.clone())
                .map_err(|err| Error::Format(format!("task #{index}: {err}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let exported_at = value
        .get("exportedAt")
        .and_then(|raw| raw.as_str())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc));
    let version = value
        .get("version")
        .and_then(|raw| raw.as_str())
        .map(str::to_string);

    Ok(ExportData {
        tasks,
        exported_at,
        version,
    })
}

/// Import an export document into the signed-in user's partition.
pub fn import_tasks(
    tasks: &dyn TaskRepository,
    projects: &dyn ProjectRepository,
    session: &mut Session,
    text: &str,
    mode: ImportMode,
) -> Result<ImportReport> {
    let data = parse_export(text)?;
    if mode == ImportMode::Replace {
        reject_duplicate_ids(&data.tasks)?;
    }
    if let Some(version) = data.version.as_deref() {
        if version != EXPORT_VERSION {
            tracing::warn!(version, "importing export with unexpected version");
        }
    }

    let known_projects: HashSet<String> = projects
        .list_projects()?
        .into_iter()
        .map(|project| project.id)
        .collect();

    let mut report = ImportReport {
        mode,
        imported: 0,
        removed: 0,
        detached: 0,
        seeded_history: 0,
        task_ids: Vec::with_capacity(data.tasks.len()),
    };

    if mode == ImportMode::Replace {
        report.removed = tasks.delete_all_tasks()?;
        session.clear_active();
    }

    for mut task in data.tasks {
        if mode == ImportMode::Merge || task.id.trim().is_empty() {
            task.id = Uuid::new_v4().to_string();
        }
        if let Some(project_id) = task.project_id.as_deref() {
            if !known_projects.contains(project_id) {
                task.project_id = None;
                report.detached += 1;
            }
        }
        if task.status_history.is_empty() {
            task.status_history = vec![StatusHistoryEntry::open(task.status, task.created_at)];
            report.seeded_history += 1;
        }

        tasks.insert_task(&task)?;
        report.imported += 1;
        report.task_ids.push(task.id);
    }

    tracing::info!(
        mode = %mode,
        imported = report.imported,
        removed = report.removed,
        "imported tasks"
    );
    Ok(report)
}

fn reject_duplicate_ids(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !task.id.trim().is_empty() && !seen.insert(task.id.as_str()) {
            return Err(Error::Format(format!("duplicate task id: {}", task.id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewProject, NewTask, Project, TaskPriority, TaskStatus};
    use crate::repository::MemoryStore;
    use crate::workflow::{Clock, ManualClock, TaskWorkflow};
    use chrono::Duration;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn session() -> Session {
        Session::new("u1", "ana@example.com", base_time())
    }

    fn seeded_store(clock: &ManualClock) -> MemoryStore {
        let store = MemoryStore::new();
        let workflow = TaskWorkflow::new(&store, &store, clock);
        let mut session = session();
        let report = workflow
            .create_task(NewTask::new("Write report", TaskPriority::High))
            .expect("create");
        clock.advance(Duration::minutes(3));
        workflow.start_task(&mut session, &report.id).expect("start");
        clock.advance(Duration::minutes(40));
        workflow.complete_task(&mut session, &report.id).expect("complete");
        workflow
            .create_task(NewTask::new("Plan week", TaskPriority::Low))
            .expect("create");
        store
    }

    #[test]
    fn export_envelope_has_version_and_timestamps() {
        let clock = ManualClock::new(base_time());
        let store = seeded_store(&clock);
        let text = export_tasks(&store.list_tasks().expect("list"), clock.now()).expect("export");

        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["version"], "1.0.0");
        assert!(value["exportedAt"].is_string());
        assert_eq!(value["tasks"].as_array().expect("tasks").len(), 2);
        assert!(value["tasks"][0]["createdAt"].is_string());
        assert!(value["tasks"][1]["statusHistory"][0]["changedAt"].is_string());
    }

    /// Export then replace-import yields the same task list, as long as every
    /// `projectId` resolves in the target. References that do not resolve are
    /// cleared (see `round_trip_keeps_project_only_when_target_has_it`).
    #[test]
    fn replace_import_round_trips() {
        let clock = ManualClock::new(base_time());
        let source = seeded_store(&clock);
        let original = source.list_tasks().expect("list");
        let text = export_tasks(&original, clock.now()).expect("export");

        let target = MemoryStore::new();
        let mut session = session();
        let report = import_tasks(&target, &target, &mut session, &text, ImportMode::Replace)
            .expect("import");
        assert_eq!(report.imported, 2);
        assert_eq!(target.list_tasks().expect("list"), original);
    }

    #[test]
    fn merge_import_never_reuses_ids() {
        let clock = ManualClock::new(base_time());
        let store = seeded_store(&clock);
        let existing: HashSet<String> = store
            .list_tasks()
            .expect("list")
            .into_iter()
            .map(|task| task.id)
            .collect();
        let text = export_tasks(&store.list_tasks().expect("list"), clock.now()).expect("export");

        let mut session = session();
        let report =
            import_tasks(&store, &store, &mut session, &text, ImportMode::Merge).expect("import");
        assert_eq!(report.imported, 2);
        assert!(report.task_ids.iter().all(|id| !existing.contains(id)));
        assert_eq!(store.list_tasks().expect("list").len(), 4);
    }

    #[test]
    fn missing_tasks_key_leaves_store_untouched() {
        let clock = ManualClock::new(base_time());
        let store = seeded_store(&clock);
        let before = store.list_tasks().expect("list");
        let mut session = session();

        for text in [r#"{"version":"1.0.0"}"#, r#"{"tasks":{}}"#, "not json", r#"{"tasks":[{"id":1}]}"#] {
            for mode in [ImportMode::Merge, ImportMode::Replace] {
                let err = import_tasks(&store, &store, &mut session, text, mode).expect_err("rejected");
                assert!(matches!(err, Error::Format(_)), "{text}: {err}");
            }
        }
        assert_eq!(store.list_tasks().expect("list"), before);
    }

    #[test]
    fn replace_clears_active_pointer_and_counts_removed() {
        let clock = ManualClock::new(base_time());
        let store = seeded_store(&clock);
        let mut session = session();
        session.set_active("stale");

        let report = import_tasks(
            &store,
            &store,
            &mut session,
            r#"{"tasks": []}"#,
            ImportMode::Replace,
        )
        .expect("import");
        assert_eq!(report.removed, 2);
        assert_eq!(session.active_task_id, None);
        assert!(store.list_tasks().expect("list").is_empty());
    }

    #[test]
    fn unknown_projects_are_detached_and_empty_history_is_seeded() {
        let store = MemoryStore::new();
        store
            .insert_project(&Project::new("p1", NewProject::new("Home"), base_time()))
            .expect("project");
        let text = r#"{
            "tasks": [
                {"id": "a", "title": "Known", "priority": "low", "status": "active",
                 "projectId": "p1", "createdAt": "2025-01-01T10:00:00Z"},
                {"id": "b", "title": "Unknown", "priority": "high", "status": "new",
                 "projectId": "gone", "createdAt": "2025-01-02T10:00:00Z",
                 "statusHistory": [{"status": "new", "changedAt": "2025-01-02T10:00:00Z"}]}
            ]
        }"#;

        let mut session = session();
        let report =
            import_tasks(&store, &store, &mut session, text, ImportMode::Replace).expect("import");
        assert_eq!(report.detached, 1);
        assert_eq!(report.seeded_history, 1);

        let known = store.get_task("a").expect("get").expect("a");
        assert_eq!(known.project_id.as_deref(), Some("p1"));
        assert_eq!(known.status_history.len(), 1);
        assert_eq!(known.status_history[0].status, TaskStatus::Active);
        assert_eq!(known.status_history[0].changed_at, known.created_at);

        let unknown = store.get_task("b").expect("get").expect("b");
        assert_eq!(unknown.project_id, None);
    }

    #[test]
    fn round_trip_keeps_project_only_when_target_has_it() {
        let clock = ManualClock::new(base_time());
        let source = MemoryStore::new();
        let project = Project::new("p1", NewProject::new("Home"), base_time());
        source.insert_project(&project).expect("project");
        let workflow = TaskWorkflow::new(&source, &source, &clock);
        let mut data = NewTask::new("Filed", TaskPriority::Medium);
        data.project_id = Some("p1".to_string());
        let task = workflow.create_task(data).expect("create");
        let original = source.list_tasks().expect("list");
        let text = export_tasks(&original, clock.now()).expect("export");

        let with_project = MemoryStore::new();
        with_project.insert_project(&project).expect("project");
        let mut session = session();
        let report = import_tasks(
            &with_project,
            &with_project,
            &mut session,
            &text,
            ImportMode::Replace,
        )
        .expect("import");
        assert_eq!(report.detached, 0);
        assert_eq!(with_project.list_tasks().expect("list"), original);

        let empty = MemoryStore::new();
        let report =
            import_tasks(&empty, &empty, &mut session, &text, ImportMode::Replace).expect("import");
        assert_eq!(report.detached, 1);
        let imported = empty.get_task(&task.id).expect("get").expect("task");
        assert_eq!(imported.project_id, None);
        assert_eq!(imported.status_history, task.status_history);
    }

    #[test]
    fn replace_rejects_duplicate_ids_before_deleting() {
        let clock = ManualClock::new(base_time());
        let store = seeded_store(&clock);
        let text = r#"{"tasks": [
            {"id": "x", "title": "One", "priority": "low", "status": "new", "createdAt": "2025-01-01T10:00:00Z"},
            {"id": "x", "title": "Two", "priority": "low", "status": "new", "createdAt": "2025-01-01T10:00:00Z"}
        ]}"#;
        let mut session = session();
        let err = import_tasks(&store, &store, &mut session, text, ImportMode::Replace)
            .expect_err("duplicate");
        assert!(matches!(err, Error::Format(_)));
        assert_eq!(store.list_tasks().expect("list").len(), 2);
    }

    #[test]
    fn store_failure_mid_import_keeps_inserted_subset() {
        let store = MemoryStore::new();
        let text = r#"{"tasks": [
            {"id": "a", "title": "One", "priority": "low", "status": "new", "createdAt": "2025-01-01T10:00:00Z"},
            {"id": "b", "title": "Two", "priority": "low", "status": "new", "createdAt": "2025-01-01T11:00:00Z"}
        ]}"#;
        store.fail_after_writes(1);
        let mut session = session();
        let err = import_tasks(&store, &store, &mut session, text, ImportMode::Merge)
            .expect_err("transport");
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(store.list_tasks().expect("list").len(), 1);
    }

    #[test]
    fn import_mode_parses() {
        assert_eq!("Replace".parse::<ImportMode>().expect("mode"), ImportMode::Replace);
        assert_eq!(ImportMode::default(), ImportMode::Merge);
        assert!("upsert".parse::<ImportMode>().is_err());
    }
}
