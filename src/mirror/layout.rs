use crate::error::MirrorError;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

pub const BEFORE_DIR: &str = "before";
pub const AFTER_DIR: &str = "after";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDirs {
    /// Task folder, or the month/site folder when no task is set.
    pub scope_dir: PathBuf,
    pub before_dir: PathBuf,
    pub after_dir: PathBuf,
}

pub fn month_folder_name(at: &DateTime<Local>) -> String {
    at.format("%B %Y").to_string()
}

/// Trimmed task name, `None` when blank.
pub fn clean_task(task: Option<&str>) -> Result<Option<String>> {
    let Some(task) = task.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if task == "." || task == ".." || task.contains(['/', '\\']) {
        return Err(MirrorError::InvalidTask(task.to_string()).into());
    }
    Ok(Some(task.to_string()))
}

/// Compute `root/key/[Month Year/][task/]{before,after}` and create both leaves.
pub fn build_paths(
    backup_root: &Path,
    folder_key: &str,
    task: Option<&str>,
    month_folder_enabled: bool,
    at: &DateTime<Local>,
) -> Result<BackupDirs> {
    let mut scope_dir = backup_root.join(folder_key);
    if month_folder_enabled {
        scope_dir.push(month_folder_name(at));
    }
    if let Some(task) = clean_task(task)? {
        scope_dir.push(task);
    }

    let before_dir = scope_dir.join(BEFORE_DIR);
    let after_dir = scope_dir.join(AFTER_DIR);
    for dir in [&before_dir, &after_dir] {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(BackupDirs {
        scope_dir,
        before_dir,
        after_dir,
    })
}
