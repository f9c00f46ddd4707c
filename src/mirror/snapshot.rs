use crate::error::MirrorError;
use crate::mirror::audit;
use crate::mirror::folders::FolderMapper;
use crate::mirror::layout::{BackupDirs, build_paths};
use crate::mirror::ledger::{self, LedgerEntry};
use crate::mirror::paths::MirrorPaths;
use crate::mirror::relpath::relative_path;
use crate::mirror::util::{file_name_string, format_timestamp, path_string};
use crate::mirror::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const EXCLUDED_FILE_NAMES: &[&str] = &["default.sublime-commands", ".DS_Store", "Thumbs.db"];
const EXCLUDED_SUFFIXES: &[&str] = &[".sublime-commands"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    #[default]
    Auto,
    Before,
    After,
}

impl SnapshotMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for SnapshotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            other => Err(format!("unknown snapshot mode `{other}` (use auto, before or after)")),
        }
    }
}

/// Everything a backup call needs besides the file itself.
#[derive(Debug, Clone)]
pub struct BackupContext {
    pub paths: MirrorPaths,
    pub create_month_folder: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotRequest<'a> {
    pub file_path: &'a Path,
    pub site_name: &'a str,
    pub mode: SnapshotMode,
    pub task: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    pub scope_dir: PathBuf,
    pub before_dir: PathBuf,
    pub after_dir: PathBuf,
    pub site: String,
    pub folder_key: String,
    pub relative_path: String,
    pub written: Vec<PathBuf>,
    pub ledger_entry_created: bool,
}

pub fn is_excluded(file_path: &Path) -> bool {
    let name = file_name_string(file_path);
    EXCLUDED_FILE_NAMES.contains(&name.as_str())
        || EXCLUDED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn copy_into(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::copy(source, target).with_context(|| {
        format!("failed to copy {} to {}", source.display(), target.display())
    })?;
    Ok(())
}

fn replace_with(source: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        fs::remove_file(target)
            .with_context(|| format!("failed to remove {}", target.display()))?;
    }
    copy_into(source, target)
}

fn dir_of(path: &Path) -> String {
    path.parent().map(path_string).unwrap_or_default()
}

fn new_entry(site: &str, snapshot: &Path, at: &str) -> LedgerEntry {
    LedgerEntry {
        first_backup_time: at.to_string(),
        last_backup_time: None,
        site: site.to_string(),
        backup_dir: dir_of(snapshot),
    }
}

pub fn try_backup_file(
    ctx: &BackupContext,
    req: &SnapshotRequest<'_>,
    at: &DateTime<Local>,
) -> Result<SnapshotOutcome> {
    let source = req.file_path;
    if is_excluded(source) {
        return Err(MirrorError::ExcludedFile(source.display().to_string()).into());
    }
    if !source.is_file() {
        return Err(MirrorError::MissingSource(source.display().to_string()).into());
    }

    let folder_key = FolderMapper::new(&ctx.paths).resolve(req.site_name);
    let BackupDirs {
        scope_dir,
        before_dir,
        after_dir,
    } = build_paths(
        &ctx.paths.backup_root,
        &folder_key,
        req.task,
        ctx.create_month_folder,
        at,
    )?;

    let relative = relative_path(&path_string(source));
    let before_path = before_dir.join(&relative);
    let after_path = after_dir.join(&relative);
    let stamp = format_timestamp(at);

    let mut ledger = ledger::load(&ctx.paths);
    let mut written = Vec::new();
    let mut created = false;

    match req.mode {
        SnapshotMode::Before => {
            copy_into(source, &before_path)?;
            written.push(before_path.clone());
            if !ledger.contains_key(&relative) {
                ledger.insert(relative.clone(), new_entry(req.site_name, &before_path, &stamp));
                created = true;
            }
        }
        SnapshotMode::After => {
            replace_with(source, &after_path)?;
            written.push(after_path.clone());
            if let Some(entry) = ledger.get_mut(&relative) {
                entry.backup_dir = dir_of(&after_path);
            }
        }
        SnapshotMode::Auto => {
            if !ledger.contains_key(&relative) {
                copy_into(source, &before_path)?;
                written.push(before_path.clone());
                ledger.insert(relative.clone(), new_entry(req.site_name, &before_path, &stamp));
                created = true;
            }
            replace_with(source, &after_path)?;
            written.push(after_path.clone());
            if let Some(entry) = ledger.get_mut(&relative) {
                entry.backup_dir = dir_of(&after_path);
            }
        }
    }

    if let Some(entry) = ledger.get_mut(&relative) {
        entry.last_backup_time = Some(stamp.clone());
        entry.site = req.site_name.to_string();
    }
    ledger::save(&ctx.paths, &ledger)?;

    audit::record(
        &ctx.paths.logs_dir,
        "snapshot",
        "ok",
        &format!(
            "mode={} site={} file={} relative={} written={}",
            req.mode,
            req.site_name,
            source.display(),
            relative,
            written.len()
        ),
    );

    Ok(SnapshotOutcome {
        scope_dir,
        before_dir,
        after_dir,
        site: req.site_name.to_string(),
        folder_key,
        relative_path: relative,
        written,
        ledger_entry_created: created,
    })
}

/// Run one backup; any failure is logged and reported as `None`.
pub fn backup_file(ctx: &BackupContext, req: &SnapshotRequest<'_>) -> Option<SnapshotOutcome> {
    match try_backup_file(ctx, req, &Local::now()) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            let err_text = format!("{err:#}");
            warn::emit(WarnEvent {
                code: "BACKUP_FAILED",
                stage: "snapshot",
                action: req.mode.as_str(),
                site: req.site_name,
                file: &path_string(req.file_path),
                reason: "backup-aborted",
                err: &err_text,
            });
            audit::record(&ctx.paths.logs_dir, "snapshot", "error", &err_text);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::ledger::Ledger;
    use crate::mirror::store::load_document;
    use chrono::{Duration, TimeZone};
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        _tmp: TempDir,
        ctx: BackupContext,
        source: PathBuf,
    }

    fn fixture(month: bool) -> Fixture {
        let tmp = tempdir().expect("tempdir");
        let source = tmp.path().join("work/var/www/shop/index.php");
        fs::create_dir_all(source.parent().expect("parent")).expect("mkdir");
        fs::write(&source, "v1").expect("write v1");
        let ctx = BackupContext {
            paths: MirrorPaths::under(&tmp.path().join("backups")),
            create_month_folder: month,
        };
        Fixture {
            _tmp: tmp,
            ctx,
            source,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, day, hour, 0, 0)
            .single()
            .expect("local time")
    }

    fn request<'a>(source: &'a Path, mode: SnapshotMode, task: Option<&'a str>) -> SnapshotRequest<'a> {
        SnapshotRequest {
            file_path: source,
            site_name: "Shop",
            mode,
            task,
        }
    }

    #[test]
    fn auto_mode_keeps_first_before_and_refreshes_after() {
        let fx = fixture(true);
        let req = request(&fx.source, SnapshotMode::Auto, Some("task_7"));

        let first = try_backup_file(&fx.ctx, &req, &at(10, 9)).expect("first backup");
        assert_eq!(first.relative_path, "shop/index.php");
        assert!(first.ledger_entry_created);
        assert_eq!(
            first.before_dir,
            fx.ctx.paths.backup_root.join("Shop/January 2024/task_7/before")
        );

        fs::write(&fx.source, "v2").expect("write v2");
        let second = try_backup_file(&fx.ctx, &req, &at(10, 11)).expect("second backup");
        assert!(!second.ledger_entry_created);
        assert_eq!(second.written.len(), 1);

        let before = fs::read_to_string(first.before_dir.join("shop/index.php")).expect("before");
        let after = fs::read_to_string(first.after_dir.join("shop/index.php")).expect("after");
        assert_eq!(before, "v1");
        assert_eq!(after, "v2");
    }

    #[test]
    fn ledger_first_time_is_stable_and_last_time_advances() {
        let fx = fixture(false);
        let req = request(&fx.source, SnapshotMode::Auto, None);
        try_backup_file(&fx.ctx, &req, &at(3, 8)).expect("first");
        try_backup_file(&fx.ctx, &req, &(at(3, 8) + Duration::minutes(5))).expect("second");

        let ledger: Ledger = load_document(&fx.ctx.paths.ledger_file).expect("ledger");
        let entry = ledger.get("shop/index.php").expect("entry");
        assert_eq!(entry.first_backup_time, "2024-01-03 08:00:00");
        assert_eq!(entry.last_backup_time.as_deref(), Some("2024-01-03 08:05:00"));
        assert!(entry.latest_time() >= entry.first_backup_time.as_str());
        assert_eq!(entry.site, "Shop");
        assert!(entry.backup_dir.ends_with("Shop/after/shop"));
    }

    #[test]
    fn explicit_before_overwrites_and_after_only_updates_existing_entry() {
        let fx = fixture(false);
        let after_req = request(&fx.source, SnapshotMode::After, None);
        try_backup_file(&fx.ctx, &after_req, &at(4, 9)).expect("after without entry");
        assert!(ledger::load(&fx.ctx.paths).is_empty());

        let before_req = request(&fx.source, SnapshotMode::Before, None);
        let out = try_backup_file(&fx.ctx, &before_req, &at(4, 10)).expect("before");
        assert!(out.ledger_entry_created);
        fs::write(&fx.source, "v2").expect("write v2");
        try_backup_file(&fx.ctx, &before_req, &at(4, 11)).expect("before again");
        let before = fs::read_to_string(out.before_dir.join("shop/index.php")).expect("read");
        assert_eq!(before, "v2");

        let entry = ledger::load(&fx.ctx.paths)
            .remove("shop/index.php")
            .expect("entry");
        assert_eq!(entry.first_backup_time, "2024-01-04 10:00:00");
        assert_eq!(entry.last_backup_time.as_deref(), Some("2024-01-04 11:00:00"));
    }

    #[test]
    fn site_changes_are_recorded_on_the_shared_entry() {
        let fx = fixture(false);
        try_backup_file(&fx.ctx, &request(&fx.source, SnapshotMode::Auto, None), &at(5, 9))
            .expect("first");
        let renamed = SnapshotRequest {
            site_name: "Shop Two",
            ..request(&fx.source, SnapshotMode::Auto, None)
        };
        try_backup_file(&fx.ctx, &renamed, &at(5, 10)).expect("second");
        let entry = ledger::load(&fx.ctx.paths)
            .remove("shop/index.php")
            .expect("entry");
        assert_eq!(entry.site, "Shop Two");
    }

    #[test]
    fn missing_and_excluded_files_fail_without_side_effects() {
        let fx = fixture(false);
        let missing = fx.source.with_file_name("absent.php");
        assert!(backup_file(&fx.ctx, &request(&missing, SnapshotMode::Auto, None)).is_none());

        let excluded = fx.source.with_file_name(".DS_Store");
        fs::write(&excluded, "meta").expect("write");
        assert!(backup_file(&fx.ctx, &request(&excluded, SnapshotMode::Auto, None)).is_none());
        assert!(!fx.ctx.paths.ledger_file.exists());
    }

    #[test]
    fn parent_segments_and_dot_sites_stay_inside_the_backup_root() {
        let fx = fixture(false);
        let outside = fx._tmp.path().join("etc/secret.conf");
        fs::create_dir_all(outside.parent().expect("parent")).expect("mkdir");
        fs::write(&outside, "secret").expect("write secret");
        let dotted = fx
            .source
            .parent()
            .expect("parent")
            .join("../../../../etc/secret.conf");
        assert!(dotted.is_file());

        let req = SnapshotRequest {
            site_name: "..",
            ..request(&dotted, SnapshotMode::Auto, None)
        };
        let out = try_backup_file(&fx.ctx, &req, &at(6, 9)).expect("backup");
        assert_eq!(out.folder_key, ".._1");
        assert!(out.relative_path.split('/').all(|seg| seg != ".." && seg != "."));
        assert!(out.scope_dir.starts_with(&fx.ctx.paths.backup_root));
        for path in &out.written {
            assert!(path.starts_with(&out.before_dir) || path.starts_with(&out.after_dir));
            assert!(path.components().all(|c| c != std::path::Component::ParentDir));
        }
        assert_eq!(fs::read_to_string(&outside).expect("read"), "secret");
    }

    #[test]
    fn exclusion_rules_match_metadata_files() {
        assert!(is_excluded(Path::new("/x/Thumbs.db")));
        assert!(is_excluded(Path::new("/x/My.sublime-commands")));
        assert!(!is_excluded(Path::new("/x/index.php")));
    }

    #[test]
    fn mode_parses_from_cli_text() {
        assert_eq!("AFTER".parse::<SnapshotMode>(), Ok(SnapshotMode::After));
        assert_eq!("".parse::<SnapshotMode>(), Ok(SnapshotMode::Auto));
        assert!("later".parse::<SnapshotMode>().is_err());
    }
}
