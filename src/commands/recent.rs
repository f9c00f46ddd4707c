use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::mirror::ledger::{self, recent_backups};

pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct RecentOptions {
    pub limit: usize,
}

pub fn run(opts: &RecentOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("recent");

    let ledger = ledger::load(&ws.paths);
    let recent = recent_backups(&ledger, opts.limit);
    report.detail(format!("entries={}/{}", recent.len(), ledger.len()));
    for (relative, entry) in recent {
        report.detail(format!(
            "{} site={} at={} dir={}",
            relative,
            entry.site,
            entry.latest_time(),
            entry.backup_dir
        ));
    }
    Ok(report)
}
