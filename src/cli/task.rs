//! vt task command implementations.

use std::path::PathBuf;

use crate::cli::{short_id, UserContext};
use crate::error::{Error, Result};
use crate::model::{NewTask, Task, TaskPriority, TaskStatus, TaskUpdate};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::projects::ProjectService;
use crate::query::{self, ProjectFilter, SortDirection, TaskFilter};
use crate::repository::{ProjectRepository, TaskRepository};
use crate::stats::{self, format_duration};
use crate::workflow::{SystemClock, TaskWorkflow};

pub struct NewOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub estimate: Option<u64>,
    pub project: Option<String>,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ListOptions {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project: Option<String>,
    pub archived: bool,
    pub sort: Option<String>,
    pub asc: bool,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ShowOptions {
    pub id: String,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub clear_description: bool,
    pub priority: Option<String>,
    pub estimate: Option<u64>,
    pub clear_estimate: bool,
    pub status: Option<String>,
    pub project: Option<String>,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Start,
    Pause,
    Complete,
    Cancel,
}

impl TransitionAction {
    fn command(&self) -> &'static str {
        match self {
            TransitionAction::Start => "task start",
            TransitionAction::Pause => "task pause",
            TransitionAction::Complete => "task complete",
            TransitionAction::Cancel => "task cancel",
        }
    }

    fn header(&self) -> &'static str {
        match self {
            TransitionAction::Start => "Task started",
            TransitionAction::Pause => "Task paused",
            TransitionAction::Complete => "Task completed",
            TransitionAction::Cancel => "Task cancelled",
        }
    }
}

pub struct TransitionOptions {
    pub id: String,
    pub action: TransitionAction,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ArchiveOptions {
    pub id: String,
    pub archived: bool,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct DeleteOptions {
    pub id: String,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ActiveOptions {
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct StatsOptions {
    pub project: Option<String>,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct TaskListOutput {
    total: usize,
    shown: usize,
    tasks: Vec<Task>,
}

#[derive(serde::Serialize)]
struct TaskDeleteOutput {
    id: String,
    deleted: bool,
}

#[derive(serde::Serialize)]
struct ActiveTaskOutput {
    task: Option<Task>,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let priority = match options.priority.as_deref() {
        Some(raw) => raw.parse::<TaskPriority>()?,
        None => ctx.config.tasks.priority()?,
    };
    let project_id = options
        .project
        .as_deref()
        .map(|raw| resolve_project(&ctx, raw))
        .transpose()?;

    let mut data = NewTask::new(options.title, priority);
    data.description = options.description;
    data.estimated_time = options.estimate;
    data.project_id = project_id;

    let clock = SystemClock;
    let workflow = TaskWorkflow::new(&ctx.store, &ctx.store, &clock);
    let task = workflow.create_task(data)?;

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &task);
    human.push_next_step(format!("vt task start {}", short_id(&task.id)));
    emit_success(options.output, "task new", &task, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let project = match options.project.as_deref() {
        None => ProjectFilter::Any,
        Some(raw) => match ProjectFilter::parse(raw) {
            ProjectFilter::Project(prefix) => ProjectFilter::Project(resolve_project(&ctx, &prefix)?),
            other => other,
        },
    };
    let filter = TaskFilter {
        search: options.search,
        status: options.status.as_deref().map(str::parse).transpose()?,
        priority: options.priority.as_deref().map(str::parse).transpose()?,
        project,
        include_archived: options.archived,
    };
    let key = match options.sort.as_deref() {
        Some(raw) => raw.parse()?,
        None => ctx.config.tasks.sort()?,
    };
    let direction = if options.asc {
        SortDirection::Asc
    } else {
        ctx.config.tasks.direction()?
    };

    let all = ctx.store.list_tasks()?;
    let total = all.len();
    let tasks = query::filter_and_sort(all, &filter, key, direction);

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Shown", format!("{} of {}", tasks.len(), total));
    human.push_summary("Sort", format!("{} {}", key, direction.as_str()));
    for task in &tasks {
        human.push_detail(task_line(task, ctx.session.is_active(&task.id)));
    }
    if tasks.is_empty() && total == 0 {
        human.push_next_step("vt task new \"<title>\"");
    }

    let output = TaskListOutput {
        total,
        shown: tasks.len(),
        tasks,
    };
    emit_success(options.output, "task list", &output, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let id = resolve_task(&ctx, &options.id)?;
    let task = ctx
        .store
        .get_task(&id)?
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, &task);
    for entry in &task.status_history {
        let duration = match entry.time_in_status {
            Some(minutes) => format_duration(minutes),
            None => "current".to_string(),
        };
        human.push_detail(format!(
            "{} {} ({})",
            entry.changed_at.to_rfc3339(),
            entry.status,
            duration
        ));
    }

    emit_success(options.output, "task show", &task, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = UserContext::load(options.home)?;
    let id = resolve_task(&ctx, &options.id)?;

    let project_id = match options.project.as_deref() {
        None => None,
        Some(raw) => match ProjectFilter::parse(raw) {
            ProjectFilter::Unassigned => Some(None),
            ProjectFilter::Project(prefix) => Some(Some(resolve_project(&ctx, &prefix)?)),
            ProjectFilter::Any => None,
        },
    };
    let update = TaskUpdate {
        title: options.title,
        description: if options.clear_description {
            Some(None)
        } else {
            options.description.map(Some)
        },
        priority: options.priority.as_deref().map(str::parse).transpose()?,
        estimated_time: if options.clear_estimate {
            Some(None)
        } else {
            options.estimate.map(Some)
        },
        status: options
            .status
            .as_deref()
            .map(str::parse::<TaskStatus>)
            .transpose()?,
        project_id,
        archived: None,
    };
    if update.is_empty() {
        return Err(Error::InvalidArgument("nothing to change".to_string()));
    }

    let before = ctx.session.clone();
    let clock = SystemClock;
    let task = {
        let workflow = TaskWorkflow::new(&ctx.store, &ctx.store, &clock);
        workflow.update_task(&mut ctx.session, &id, update)?
    };
    ctx.save_session_if_changed(&before)?;

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &task);
    emit_success(options.output, "task edit", &task, Some(&human))
}

pub fn run_transition(options: TransitionOptions) -> Result<()> {
    let mut ctx = UserContext::load(options.home)?;
    let id = resolve_task(&ctx, &options.id)?;

    let before = ctx.session.clone();
    let clock = SystemClock;
    let (task, paused) = {
        let workflow = TaskWorkflow::new(&ctx.store, &ctx.store, &clock);
        let previous = workflow
            .active_task(&ctx.session)?
            .filter(|task| task.id != id && task.status == TaskStatus::Active);
        let task = match options.action {
            TransitionAction::Start => workflow.start_task(&mut ctx.session, &id)?,
            TransitionAction::Pause => workflow.pause_task(&mut ctx.session, &id)?,
            TransitionAction::Complete => workflow.complete_task(&mut ctx.session, &id)?,
            TransitionAction::Cancel => workflow.cancel_task(&mut ctx.session, &id)?,
        };
        let paused = match options.action {
            TransitionAction::Start => previous,
            _ => None,
        };
        (task, paused)
    };
    ctx.save_session_if_changed(&before)?;

    let mut human = HumanOutput::new(options.action.header());
    push_task_summary(&mut human, &task);
    if let Some(paused) = paused {
        human.push_warning(format!("paused {} {}", short_id(&paused.id), paused.title));
    }
    match task.status {
        TaskStatus::Active => {
            human.push_next_step(format!("vt task complete {}", short_id(&task.id)));
        }
        TaskStatus::New => {
            human.push_next_step(format!("vt task start {}", short_id(&task.id)));
        }
        TaskStatus::Completed | TaskStatus::Cancelled => {}
    }

    emit_success(options.output, options.action.command(), &task, Some(&human))
}

pub fn run_archive(options: ArchiveOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let id = resolve_task(&ctx, &options.id)?;
    let clock = SystemClock;
    let workflow = TaskWorkflow::new(&ctx.store, &ctx.store, &clock);
    let task = if options.archived {
        workflow.archive_task(&id)?
    } else {
        workflow.unarchive_task(&id)?
    };

    let mut human = HumanOutput::new(if options.archived {
        "Task archived"
    } else {
        "Task unarchived"
    });
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    emit_success(
        options.output,
        if options.archived {
            "task archive"
        } else {
            "task unarchive"
        },
        &task,
        Some(&human),
    )
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut ctx = UserContext::load(options.home)?;
    let id = resolve_task(&ctx, &options.id)?;

    let before = ctx.session.clone();
    let clock = SystemClock;
    {
        let workflow = TaskWorkflow::new(&ctx.store, &ctx.store, &clock);
        workflow.delete_task(&mut ctx.session, &id)?;
    }
    ctx.save_session_if_changed(&before)?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", id.clone());
    emit_success(
        options.output,
        "task delete",
        &TaskDeleteOutput { id, deleted: true },
        Some(&human),
    )
}

pub fn run_active(options: ActiveOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let clock = SystemClock;
    let workflow = TaskWorkflow::new(&ctx.store, &ctx.store, &clock);
    let task = workflow.active_task(&ctx.session)?;

    let human = match task.as_ref() {
        Some(task) => {
            let mut human = HumanOutput::new("Active task");
            push_task_summary(&mut human, task);
            human
        }
        None => {
            let mut human = HumanOutput::new("No active task");
            human.push_next_step("vt task start <id>");
            human
        }
    };
    emit_success(
        options.output,
        "task active",
        &ActiveTaskOutput { task },
        Some(&human),
    )
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;

    if let Some(raw) = options.project.as_deref() {
        let project_id = resolve_project(&ctx, raw)?;
        let clock = SystemClock;
        let service = ProjectService::new(&ctx.store, &ctx.store, &clock);
        let report = service.project_stats(&project_id)?;
        let mut human = HumanOutput::new(format!("Project {project_id}"));
        human.push_summary("Tasks", report.total_tasks.to_string());
        human.push_summary("Completed", report.completed_tasks.to_string());
        human.push_summary("Active", report.active_tasks.to_string());
        human.push_summary("Completion rate", format!("{:.1}%", report.completion_rate));
        return emit_success(options.output, "task stats", &report, Some(&human));
    }

    let report = stats::calculate_task_stats(&ctx.store.list_tasks()?);
    let mut human = HumanOutput::new("Task statistics");
    human.push_summary("Tasks", report.total_tasks.to_string());
    human.push_summary("Completed", report.completed_tasks.to_string());
    human.push_summary("Completion rate", format!("{:.1}%", report.completion_rate));
    human.push_summary("Time tracked", format_duration(report.active_time));
    human.push_summary(
        "Average completion",
        format_duration(report.average_completion_time.round() as u64),
    );
    for (status, count) in &report.status_distribution {
        let average = report
            .average_time_in_status
            .get(status)
            .copied()
            .unwrap_or(0.0);
        human.push_detail(format!(
            "{status}: {count} (avg {})",
            format_duration(average.round() as u64)
        ));
    }
    for (priority, count) in &report.priority_distribution {
        human.push_detail(format!("{priority} priority: {count}"));
    }
    emit_success(options.output, "task stats", &report, Some(&human))
}

pub(crate) fn resolve_task(ctx: &UserContext, input: &str) -> Result<String> {
    query::resolve_task_id(&ctx.store.list_tasks()?, input)
}

pub(crate) fn resolve_project(ctx: &UserContext, input: &str) -> Result<String> {
    query::resolve_project_id(&ctx.store.list_projects()?, input)
}

fn task_line(task: &Task, active: bool) -> String {
    let mut line = format!(
        "{} [{}] {} {}",
        short_id(&task.id),
        task.status,
        task.priority,
        task.title
    );
    if active {
        line.push_str(" *");
    }
    if task.is_archived {
        line.push_str(" [archived]");
    }
    line
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    if let Some(description) = task.description.as_ref() {
        human.push_summary("Description", description.clone());
    }
    if let Some(project_id) = task.project_id.as_ref() {
        human.push_summary("Project", project_id.clone());
    }
    if let Some(estimate) = task.estimated_time {
        human.push_summary("Estimate", format_duration(estimate));
    }
    if let Some(actual) = task.actual_time {
        human.push_summary("Actual", format_duration(actual));
    }
    if task.is_archived {
        human.push_summary("Archived", "yes");
    }
    human.push_summary("Created", task.created_at.to_rfc3339());
    if let Some(started_at) = task.started_at {
        human.push_summary("Started", started_at.to_rfc3339());
    }
    if let Some(completed_at) = task.completed_at {
        human.push_summary("Completed", completed_at.to_rfc3339());
    }
    if let Some(cancelled_at) = task.cancelled_at {
        human.push_summary("Cancelled", cancelled_at.to_rfc3339());
    }
}
