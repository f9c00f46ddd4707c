use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::mirror::layout::clean_task;
use crate::mirror::session;

#[derive(Debug, Clone)]
pub enum TaskAction {
    Show,
    Set(String),
    Clear,
}

pub fn run(action: &TaskAction) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("task");
    let mut session = ws.session();

    match action {
        TaskAction::Show => {}
        TaskAction::Set(raw) => match clean_task(Some(raw.as_str())) {
            Ok(task) => {
                session.set_task(task.as_deref());
                session::save(&ws.paths, &session)?;
            }
            Err(err) => {
                report.issue(format!("{err:#}"));
                return Ok(report);
            }
        },
        TaskAction::Clear => {
            session.set_task(None);
            session::save(&ws.paths, &session)?;
        }
    }

    report.detail(format!(
        "current_task={}",
        session.current_task.as_deref().unwrap_or("")
    ));
    report.detail(format!(
        "current_site={}",
        session.current_site.as_deref().unwrap_or("")
    ));
    Ok(report)
}
