use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::mirror::folders::FolderMapper;
use crate::mirror::ledger;
use crate::mirror::site::SiteResolver;

pub fn run() -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("status");
    let paths = &ws.paths;

    report.detail(format!("settings={}", ws.settings.describe()));
    report.detail(format!("backup_root={}", paths.backup_root.display()));
    report.detail(format!("create_month_folder={}", ws.config.create_month_folder));
    report.detail(format!("prompt_timeout_secs={}", ws.config.prompt_timeout_secs));
    report.detail(format!("ledger_file={}", paths.ledger_file.display()));
    report.detail(format!(
        "folder_mapping_file={}",
        paths.folder_mapping_file.display()
    ));
    report.detail(format!(
        "site_name_mapping_file={}",
        paths.site_name_mapping_file.display()
    ));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("session_file={}", paths.session_file.display()));

    report.detail(format!("ledger.entries={}", ledger::load(paths).len()));
    report.detail(format!(
        "folder_mapping.entries={}",
        FolderMapper::new(paths).load_map().len()
    ));
    report.detail(format!(
        "site_name_mapping.entries={}",
        SiteResolver::new(paths).load_map().len()
    ));

    let session = ws.session();
    report.detail(format!(
        "session.current_site={}",
        session.current_site.as_deref().unwrap_or("")
    ));
    report.detail(format!(
        "session.current_task={}",
        session.current_task.as_deref().unwrap_or("")
    ));

    if !paths.backup_root.exists() {
        report.issue(format!(
            "missing backup root ({}); it is created on first backup",
            paths.backup_root.display()
        ));
    }

    Ok(report)
}
