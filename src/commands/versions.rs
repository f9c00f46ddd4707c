use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, Workspace, absolute_path};
use crate::mirror::browse::find_versions;
use crate::mirror::folders::FolderMapper;
use crate::mirror::ledger;
use crate::mirror::util::path_string;

#[derive(Debug, Clone)]
pub struct VersionsOptions {
    pub file: PathBuf,
}

pub fn run(opts: &VersionsOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("versions");

    let file = path_string(&absolute_path(&opts.file)?);
    let mapping = FolderMapper::new(&ws.paths).load_map();
    let versions = find_versions(&ws.paths, &mapping, &ledger::load(&ws.paths), &file)?;

    report.detail(format!("versions={}", versions.len()));
    for version in &versions {
        report.detail(format!(
            "{} modified={} size={} sha256={} path={}",
            version.kind,
            version.modified.as_deref().unwrap_or("-"),
            version.size,
            version.sha256,
            version.path.display()
        ));
    }
    Ok(report)
}
