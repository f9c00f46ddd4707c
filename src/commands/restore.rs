use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;

use crate::commands::{CommandReport, Workspace, absolute_path};
use crate::mirror::ledger;
use crate::mirror::relpath::relative_path;
use crate::mirror::restore::restore_version;
use crate::mirror::site::{SiteResolver, host_name};
use crate::mirror::util::path_string;

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub version: PathBuf,
    pub file: PathBuf,
    pub site: Option<String>,
    pub task: Option<String>,
}

pub fn run(opts: &RestoreOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("restore");

    let version = absolute_path(&opts.version)?;
    let target = absolute_path(&opts.file)?;
    let target_str = path_string(&target);
    let session = ws.session();

    // Explicit flag, then the ledger owner, then the saved project root, then the session.
    let site = opts
        .site
        .clone()
        .or_else(|| {
            ledger::load(&ws.paths)
                .get(&relative_path(&target_str))
                .map(|entry| entry.site.clone())
                .filter(|site| !site.is_empty())
        })
        .or_else(|| SiteResolver::new(&ws.paths).lookup(&target_str))
        .or_else(|| session.current_site.clone())
        .unwrap_or_else(host_name);
    let task = opts.task.clone().or_else(|| session.current_task.clone());

    let out = restore_version(
        &ws.backup_context(),
        &version,
        &target,
        &site,
        task.as_deref(),
        &Local::now(),
    )?;
    report.detail(format!("site={site}"));
    report.detail(format!("restored_from={}", out.restored_from.display()));
    report.detail(format!("target={}", out.target.display()));
    match out.safety_copy {
        Some(copy) => report.detail(format!("safety_copy={}", copy.display())),
        None => report.detail("safety_copy=none"),
    }
    Ok(report)
}
