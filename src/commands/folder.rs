use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::mirror::folders::FolderMapper;

#[derive(Debug, Clone)]
pub struct FolderOptions {
    pub site: String,
}

pub fn run(opts: &FolderOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("folder");

    let site = opts.site.trim();
    if site.is_empty() {
        report.issue("site name cannot be empty");
        return Ok(report);
    }

    let key = FolderMapper::new(&ws.paths).try_resolve(site)?;
    report.detail(format!("site={site}"));
    report.detail(format!("folder_key={key}"));
    report.detail(format!("folder={}", ws.paths.backup_root.join(&key).display()));
    Ok(report)
}
