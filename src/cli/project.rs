//! vt project command implementations.

use std::path::PathBuf;

use crate::cli::task::resolve_project;
use crate::cli::{short_id, UserContext};
use crate::error::{Error, Result};
use crate::model::{NewProject, Project, ProjectUpdate};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::projects::ProjectService;
use crate::stats::ProjectStats;
use crate::workflow::SystemClock;

pub struct NewOptions {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub board_url: Option<String>,
    pub home: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ListOptions {
    pub archived: bool,
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
    pub name: Option<String>,
    pub description: Option<String>,
    pub clear_description: bool,
    pub color: Option<String>,
    pub board_url: Option<String>,
    pub clear_board_url: bool,
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

#[derive(serde::Serialize)]
struct ProjectListOutput {
    archived: bool,
    projects: Vec<Project>,
}

#[derive(serde::Serialize)]
struct ProjectShowOutput {
    project: Project,
    stats: ProjectStats,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let data = NewProject {
        name: options.name,
        description: options.description,
        color: Some(
            options
                .color
                .unwrap_or_else(|| ctx.config.projects.default_color.clone()),
        ),
        board_url: options.board_url,
    };

    let clock = SystemClock;
    let service = ProjectService::new(&ctx.store, &ctx.store, &clock);
    let project = service.create_project(data)?;

    let mut human = HumanOutput::new("Project created");
    push_project_summary(&mut human, &project);
    human.push_next_step(format!(
        "vt task new \"<title>\" --project {}",
        short_id(&project.id)
    ));
    emit_success(options.output, "project new", &project, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let clock = SystemClock;
    let service = ProjectService::new(&ctx.store, &ctx.store, &clock);
    let projects = if options.archived {
        service.list_archived_projects()?
    } else {
        service.list_projects()?
    };

    let mut human = HumanOutput::new(if options.archived {
        "Archived projects"
    } else {
        "Projects"
    });
    human.push_summary("Count", projects.len().to_string());
    for project in &projects {
        human.push_detail(format!(
            "{} {} {}",
            short_id(&project.id),
            project.color,
            project.name
        ));
    }

    let output = ProjectListOutput {
        archived: options.archived,
        projects,
    };
    emit_success(options.output, "project list", &output, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let id = resolve_project(&ctx, &options.id)?;
    let clock = SystemClock;
    let service = ProjectService::new(&ctx.store, &ctx.store, &clock);
    let project = service
        .get_project(&id)?
        .ok_or_else(|| Error::ProjectNotFound(id.clone()))?;
    let stats = service.project_stats(&id)?;

    let mut human = HumanOutput::new(format!("Project {}", project.id));
    push_project_summary(&mut human, &project);
    human.push_summary("Tasks", stats.total_tasks.to_string());
    human.push_summary("Completed", stats.completed_tasks.to_string());
    human.push_summary("Active", stats.active_tasks.to_string());
    human.push_summary("Completion rate", format!("{:.1}%", stats.completion_rate));

    let output = ProjectShowOutput { project, stats };
    emit_success(options.output, "project show", &output, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let id = resolve_project(&ctx, &options.id)?;
    let update = ProjectUpdate {
        name: options.name,
        description: if options.clear_description {
            Some(None)
        } else {
            options.description.map(Some)
        },
        color: options.color,
        board_url: if options.clear_board_url {
            Some(None)
        } else {
            options.board_url.map(Some)
        },
        archived: None,
    };
    if update.is_empty() {
        return Err(Error::InvalidArgument("nothing to change".to_string()));
    }

    let clock = SystemClock;
    let service = ProjectService::new(&ctx.store, &ctx.store, &clock);
    let project = service.update_project(&id, update)?;

    let mut human = HumanOutput::new("Project updated");
    push_project_summary(&mut human, &project);
    emit_success(options.output, "project edit", &project, Some(&human))
}

pub fn run_archive(options: ArchiveOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let id = resolve_project(&ctx, &options.id)?;
    let clock = SystemClock;
    let service = ProjectService::new(&ctx.store, &ctx.store, &clock);
    let (project, header, command) = if options.archived {
        (service.archive_project(&id)?, "Project archived", "project archive")
    } else {
        (
            service.unarchive_project(&id)?,
            "Project unarchived",
            "project unarchive",
        )
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    emit_success(options.output, command, &project, Some(&human))
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let ctx = UserContext::load(options.home)?;
    let id = resolve_project(&ctx, &options.id)?;
    let clock = SystemClock;
    let service = ProjectService::new(&ctx.store, &ctx.store, &clock);
    let deletion = service.delete_project(&id)?;

    let mut human = HumanOutput::new("Project deleted");
    human.push_summary("ID", deletion.project.id.clone());
    human.push_summary("Name", deletion.project.name.clone());
    human.push_summary("Tasks detached", deletion.detached_tasks.to_string());
    emit_success(options.output, "project delete", &deletion, Some(&human))
}

fn push_project_summary(human: &mut HumanOutput, project: &Project) {
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    human.push_summary("Color", project.color.clone());
    if let Some(description) = project.description.as_ref() {
        human.push_summary("Description", description.clone());
    }
    if let Some(board_url) = project.board_url.as_ref() {
        human.push_summary("Board", board_url.clone());
    }
    if project.is_archived {
        human.push_summary("Archived", "yes");
    }
    human.push_summary("Updated", project.updated_at.to_rfc3339());
}
