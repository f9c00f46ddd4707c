use anyhow::Result;
use std::path::PathBuf;

use crate::commands::site::choose_site;
use crate::commands::{CommandReport, Workspace, absolute_path};
use crate::mirror::session;
use crate::mirror::site::SiteResolver;
use crate::mirror::snapshot::{SnapshotMode, SnapshotRequest, backup_file};
use crate::mirror::util::path_string;
use crate::mirror::warn::{self, WarnEvent};

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub file: PathBuf,
    pub site: Option<String>,
    pub task: Option<String>,
    pub mode: String,
    pub no_prompt: bool,
}

pub fn run(opts: &BackupOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("backup");

    let mode: SnapshotMode = match opts.mode.parse() {
        Ok(mode) => mode,
        Err(err) => {
            report.issue(err);
            return Ok(report);
        }
    };

    let source = absolute_path(&opts.file)?;
    let file = path_string(&source);
    let mut session = ws.session();
    let task = opts.task.clone().or_else(|| session.current_task.clone());

    let site = match opts.site.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(site) => {
            SiteResolver::new(&ws.paths).remember(&file, site);
            site.to_string()
        }
        None => {
            let (site, how) = choose_site(&ws, &file, opts.no_prompt);
            report.detail(format!("site.source={}", how.as_str()));
            site
        }
    };

    let ctx = ws.backup_context();
    let req = SnapshotRequest {
        file_path: &source,
        site_name: &site,
        mode,
        task: task.as_deref(),
    };
    let Some(outcome) = backup_file(&ctx, &req) else {
        report.issue(format!("backup failed for {file}"));
        return Ok(report);
    };

    report.detail(format!("site={}", outcome.site));
    report.detail(format!("folder_key={}", outcome.folder_key));
    report.detail(format!("mode={mode}"));
    report.detail(format!("task={}", task.as_deref().unwrap_or("")));
    report.detail(format!("relative_path={}", outcome.relative_path));
    report.detail(format!("scope_dir={}", outcome.scope_dir.display()));
    report.detail(format!("before_dir={}", outcome.before_dir.display()));
    report.detail(format!("after_dir={}", outcome.after_dir.display()));
    report.detail(format!("ledger_entry_created={}", outcome.ledger_entry_created));
    for written in &outcome.written {
        report.detail(format!("written={}", written.display()));
    }

    session.current_site = Some(site.clone());
    session.set_task(task.as_deref());
    if let Err(err) = session::save(&ws.paths, &session) {
        warn::emit(WarnEvent {
            code: "SESSION_SAVE_FAILED",
            stage: "session",
            action: "save",
            site: &site,
            file: &file,
            reason: "session-not-updated",
            err: &format!("{err:#}"),
        });
    }

    Ok(report)
}
