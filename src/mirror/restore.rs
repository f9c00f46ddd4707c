use crate::error::MirrorError;
use crate::mirror::audit;
use crate::mirror::snapshot::{BackupContext, SnapshotMode, SnapshotRequest, try_backup_file};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub restored_from: PathBuf,
    pub target: PathBuf,
    /// Before-snapshot taken of the target prior to overwriting it, if it existed.
    pub safety_copy: Option<PathBuf>,
}

/// Copy a stored version back over `target`, snapshotting the current content first.
pub fn restore_version(
    ctx: &BackupContext,
    version: &Path,
    target: &Path,
    site: &str,
    task: Option<&str>,
    at: &DateTime<Local>,
) -> Result<RestoreOutcome> {
    if !version.is_file() {
        return Err(MirrorError::MissingSource(version.display().to_string()).into());
    }
    // Read first: the safety snapshot may overwrite `version` itself.
    let bytes =
        fs::read(version).with_context(|| format!("failed to read {}", version.display()))?;

    let safety_copy = if target.is_file() {
        let req = SnapshotRequest {
            file_path: target,
            site_name: site,
            mode: SnapshotMode::Before,
            task,
        };
        let outcome = try_backup_file(ctx, &req, at)
            .with_context(|| format!("failed to snapshot {} before restore", target.display()))?;
        outcome.written.into_iter().next()
    } else {
        None
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(target, &bytes).with_context(|| {
        format!("failed to restore {} to {}", version.display(), target.display())
    })?;

    audit::record(
        &ctx.paths.logs_dir,
        "restore",
        "ok",
        &format!("{} -> {}", version.display(), target.display()),
    );

    Ok(RestoreOutcome {
        restored_from: version.to_path_buf(),
        target: target.to_path_buf(),
        safety_copy,
    })
}
