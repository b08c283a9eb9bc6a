//! vt task export/import/clear command implementations.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::cli::UserContext;
use crate::error::{Error, Result};
use crate::lock;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::repository::TaskRepository;
use crate::transfer::{self, ExportData, ImportMode};
use crate::workflow::{SystemClock, TaskWorkflow};

pub struct ExportOptions {
    pub path: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ImportOptions {
    pub file: PathBuf,
    pub replace: bool,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ClearOptions {
    pub yes: bool,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct ExportFileOutput {
    path: PathBuf,
    tasks: usize,
}

#[derive(serde::Serialize)]
struct ClearOutput {
    removed: usize,
}

pub fn run_export(options: ExportOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let data = ExportData::new(ctx.store.list_tasks()?, Utc::now());

    if let Some(path) = options.path {
        let text = transfer::render_export(&data, ctx.config.export.pretty)?;
        lock::write_atomic(&path, text.as_bytes())?;
        tracing::info!(path = %path.display(), tasks = data.tasks.len(), "wrote export");

        let mut human = HumanOutput::new("Tasks exported");
        human.push_summary("File", path.display().to_string());
        human.push_summary("Tasks", data.tasks.len().to_string());
        let output = ExportFileOutput {
            tasks: data.tasks.len(),
            path,
        };
        return emit_success(options.output, "task export", &output, Some(&human));
    }

    if options.output.json {
        return emit_success(options.output, "task export", &data, None);
    }

    // The export document itself is the output; --quiet does not suppress it.
    println!("{}", transfer::render_export(&data, ctx.config.export.pretty)?);
    Ok(())
}

pub fn run_import(options: ImportOptions) -> Result<()> {
    let mut ctx = UserContext::load(options.home)?;
    let text = read_input(&options.file)?;
    let mode = if options.replace {
        ImportMode::Replace
    } else {
        ImportMode::Merge
    };

    let before = ctx.session.clone();
    let result = transfer::import_tasks(&ctx.store, &ctx.store, &mut ctx.session, &text, mode);
    // A replace that failed part-way may already have cleared the pointer.
    ctx.save_session_if_changed(&before)?;
    let report = result?;

    let mut human = HumanOutput::new("Tasks imported");
    human.push_summary("Mode", mode.to_string());
    human.push_summary("Imported", report.imported.to_string());
    if mode == ImportMode::Replace {
        human.push_summary("Removed", report.removed.to_string());
    }
    if report.detached > 0 {
        human.push_warning(format!(
            "{} task(s) referenced unknown projects and were detached",
            report.detached
        ));
    }
    if report.seeded_history > 0 {
        human.push_detail(format!(
            "{} task(s) had no status history; started one from their current status",
            report.seeded_history
        ));
    }
    human.push_next_step("vt task list");

    emit_success(options.output, "task import", &report, Some(&human))
}

pub fn run_clear(options: ClearOptions) -> Result<()> {
    if !options.yes {
        return Err(Error::InvalidArgument(
            "refusing to delete every task without --yes".to_string(),
        ));
    }

    let mut ctx = UserContext::load(options.home)?;
    let before = ctx.session.clone();
    let clock = SystemClock;
    let removed = {
        let workflow = TaskWorkflow::new(&ctx.store, &ctx.store, &clock);
        workflow.clear_all_tasks(&mut ctx.session)?
    };
    ctx.save_session_if_changed(&before)?;

    let mut human = HumanOutput::new("Tasks cleared");
    human.push_summary("Removed", removed.to_string());
    emit_success(
        options.output,
        "task clear",
        &ClearOutput { removed },
        Some(&human),
    )
}

fn read_input(path: &Path) -> Result<String> {
    let bytes = if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        bytes
    } else {
        std::fs::read(path).map_err(|err| {
            Error::InvalidArgument(format!("cannot read {}: {err}", path.display()))
        })?
    };
    String::from_utf8(bytes).map_err(|err| Error::Format(format!("not UTF-8 text: {err}")))
}
