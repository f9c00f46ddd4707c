use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;

use crate::commands::{CommandReport, Workspace, absolute_path};
use crate::mirror::archive::{ArchiveKind, build_archive};
use crate::mirror::folders::FolderMapper;
use crate::mirror::util::file_name_string;

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub folder: PathBuf,
    pub kind: Option<String>,
}

pub fn run(opts: &ArchiveOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("archive");

    let folder = absolute_path(&opts.folder)?;
    let kind = match opts.kind.as_deref().map(str::trim) {
        None | Some("") => ArchiveKind::from_dir_name(&file_name_string(&folder)),
        Some(raw) => match ArchiveKind::from_dir_name(&raw.to_ascii_lowercase()) {
            Some(kind) => Some(kind),
            None => {
                report.issue(format!("invalid archive kind `{raw}`; use `before` or `after`"));
                return Ok(report);
            }
        },
    };

    let mapping = FolderMapper::new(&ws.paths).load_map();
    let out = build_archive(&folder, &ws.paths.backup_root, &mapping, kind, &Local::now())?;
    report.detail(format!("site={}", out.site));
    report.detail(format!("files={}", out.files));
    report.detail(format!("archive={}", out.archive_path.display()));
    Ok(report)
}
