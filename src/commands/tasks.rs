use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::mirror::browse::list_tasks;
use crate::mirror::folders::FolderMapper;

#[derive(Debug, Clone, Default)]
pub struct TasksOptions {
    pub site: Option<String>,
}

pub fn run(opts: &TasksOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("tasks");

    if !ws.paths.backup_root.is_dir() {
        report.detail("tasks=0");
        return Ok(report);
    }

    let session = ws.session();
    let mapping = FolderMapper::new(&ws.paths).load_map();
    let tasks = list_tasks(
        &ws.paths,
        &mapping,
        opts.site.as_deref(),
        session.current_task.as_deref(),
    )?;

    report.detail(format!("tasks={}", tasks.len()));
    for task in &tasks {
        let marker = if session.current_task.as_deref() == Some(task.name.as_str()) {
            " current=true"
        } else {
            ""
        };
        report.detail(format!(
            "task={} sites={} files={} last_modified={}{marker}",
            task.name,
            task.sites.iter().cloned().collect::<Vec<_>>().join(","),
            task.file_count,
            task.last_modified.as_deref().unwrap_or("-"),
        ));
    }
    Ok(report)
}
