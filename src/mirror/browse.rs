//! Read-side views over the backup tree: tasks per site and stored versions of a file.

use crate::mirror::folders::{FolderMap, is_month_folder, list_site_dirs};
use crate::mirror::layout::{AFTER_DIR, BEFORE_DIR};
use crate::mirror::ledger::Ledger;
use crate::mirror::normalize::normalize;
use crate::mirror::paths::{MirrorPaths, is_reserved_dir};
use crate::mirror::relpath::relative_path;
use crate::mirror::util::{format_timestamp, path_string};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskSummary {
    pub name: String,
    pub sites: BTreeSet<String>,
    pub file_count: usize,
    pub last_modified: Option<String>,
    pub paths: Vec<PathBuf>,
    #[serde(skip)]
    latest: Option<SystemTime>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub kind: String,
    pub path: PathBuf,
    pub modified: Option<String>,
    pub size: u64,
    pub sha256: String,
}

fn child_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            out.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    out.sort();
    Ok(out)
}

fn is_task_dir_name(name: &str) -> bool {
    name != BEFORE_DIR && name != AFTER_DIR && !is_reserved_dir(name) && !is_month_folder(name)
}

fn format_system_time(at: SystemTime) -> String {
    format_timestamp(&DateTime::<Local>::from(at))
}

/// Site folder for a display name: mapped key, normalized name, then a loose name match.
pub fn find_site_folder(paths: &MirrorPaths, mapping: &FolderMap, site: &str) -> Option<String> {
    let exists = |key: &str| paths.backup_root.join(key).is_dir();
    if let Some(key) = mapping.get(site).filter(|key| exists(key)) {
        return Some(key.clone());
    }
    let normalized = normalize(site);
    if exists(&normalized) {
        return Some(normalized);
    }
    let wanted = site.to_lowercase();
    list_site_dirs(&paths.backup_root)
        .ok()?
        .into_iter()
        .find(|folder| {
            let folder = folder.to_lowercase();
            folder.contains(&wanted) || wanted.contains(&folder)
        })
}

fn record_task(tasks: &mut BTreeMap<String, TaskSummary>, site: &str, name: &str, dir: &Path) {
    let summary = tasks.entry(name.to_string()).or_insert_with(|| TaskSummary {
        name: name.to_string(),
        sites: BTreeSet::new(),
        file_count: 0,
        last_modified: None,
        paths: Vec::new(),
        latest: None,
    });
    summary.sites.insert(site.to_string());
    summary.paths.push(dir.to_path_buf());

    for entry in WalkDir::new(dir).into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        summary.file_count += 1;
        let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
        if let Some(modified) = modified {
            if summary.latest.is_none_or(|seen| modified > seen) {
                summary.latest = Some(modified);
            }
        }
    }
    summary.last_modified = summary.latest.map(format_system_time);
}

fn scan_site(tasks: &mut BTreeMap<String, TaskSummary>, site_dir: &Path, site: &str) -> Result<()> {
    for (name, path) in child_dirs(site_dir)? {
        if is_month_folder(&name) {
            for (task, task_path) in child_dirs(&path)? {
                if is_task_dir_name(&task) {
                    record_task(tasks, site, &task, &task_path);
                }
            }
        } else if is_task_dir_name(&name) {
            record_task(tasks, site, &name, &path);
        }
    }
    Ok(())
}

/// Tasks for one site (or all sites when the site is unknown), current task first.
pub fn list_tasks(
    paths: &MirrorPaths,
    mapping: &FolderMap,
    site: Option<&str>,
    current_task: Option<&str>,
) -> Result<Vec<TaskSummary>> {
    let folders = match site.and_then(|s| find_site_folder(paths, mapping, s)) {
        Some(folder) => vec![folder],
        None => list_site_dirs(&paths.backup_root)?,
    };

    let mut tasks = BTreeMap::new();
    for folder in &folders {
        scan_site(&mut tasks, &paths.backup_root.join(folder), folder)?;
    }

    let mut out: Vec<TaskSummary> = tasks.into_values().collect();
    if let Some(current) = current_task {
        if let Some(idx) = out.iter().position(|t| t.name == current) {
            let task = out.remove(idx);
            out.insert(0, task);
        }
    }
    Ok(out)
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn version_kind(relative_to_site: &str, relative: &str) -> Option<&'static str> {
    for kind in [BEFORE_DIR, AFTER_DIR] {
        let tail = format!("{kind}/{relative}");
        if relative_to_site == tail || relative_to_site.ends_with(&format!("/{tail}")) {
            return Some(kind);
        }
    }
    None
}

/// Every stored before/after copy of `file_path` under its owning site, newest first.
pub fn find_versions(
    paths: &MirrorPaths,
    mapping: &FolderMap,
    ledger: &Ledger,
    file_path: &str,
) -> Result<Vec<SnapshotVersion>> {
    let relative = relative_path(file_path);
    let Some(entry) = ledger.get(&relative) else {
        return Ok(Vec::new());
    };
    let Some(folder) = find_site_folder(paths, mapping, &entry.site) else {
        return Ok(Vec::new());
    };
    let site_dir = paths.backup_root.join(folder);

    let mut found: Vec<(Option<SystemTime>, SnapshotVersion)> = Vec::new();
    for item in WalkDir::new(&site_dir).into_iter().flatten() {
        if !item.file_type().is_file() {
            continue;
        }
        let Ok(inside) = item.path().strip_prefix(&site_dir) else {
            continue;
        };
        let Some(kind) = version_kind(&path_string(inside), &relative) else {
            continue;
        };
        let meta = item
            .metadata()
            .with_context(|| format!("failed to stat {}", item.path().display()))?;
        let modified = meta.modified().ok();
        found.push((
            modified,
            SnapshotVersion {
                kind: kind.to_string(),
                path: item.path().to_path_buf(),
                modified: modified.map(format_system_time),
                size: meta.len(),
                sha256: sha256_file(item.path())?,
            },
        ));
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.path.cmp(&b.1.path)));
    Ok(found.into_iter().map(|(_, version)| version).collect())
}
