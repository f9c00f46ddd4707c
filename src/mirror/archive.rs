//! Bundle a backup folder (site, month, task, or one of its before/after halves) into a zip.

use crate::error::MirrorError;
use crate::mirror::audit;
use crate::mirror::folders::{FolderMap, site_for_folder};
use crate::mirror::layout::{AFTER_DIR, BEFORE_DIR};
use crate::mirror::util::file_name_string;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const FALLBACK_ARCHIVE_SITE: &str = "backup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Before,
    After,
}

impl ArchiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => BEFORE_DIR,
            Self::After => AFTER_DIR,
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            BEFORE_DIR => Some(Self::Before),
            AFTER_DIR => Some(Self::After),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    pub archive_path: PathBuf,
    pub site: String,
    pub files: usize,
}

fn task_folder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^task_[\w-]+").expect("valid task regex"))
}

fn normal_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Display name of the site owning `folder`: the segment after the backup root's last segment.
pub fn archive_site_name(folder: &Path, backup_root: &Path, mapping: &FolderMap) -> String {
    let folder_parts = normal_segments(folder);
    let Some(root_last) = normal_segments(backup_root).pop() else {
        return FALLBACK_ARCHIVE_SITE.to_string();
    };
    let Some(root_index) = folder_parts
        .iter()
        .take(folder_parts.len().saturating_sub(1))
        .position(|part| *part == root_last)
    else {
        return FALLBACK_ARCHIVE_SITE.to_string();
    };
    let segment = &folder_parts[root_index + 1];
    site_for_folder(mapping, segment).unwrap_or_else(|| segment.clone())
}

/// Where the archive lands: the task folder if the path has one, else the
/// parent of a before/after folder, else the folder itself.
pub fn archive_placement(folder: &Path) -> PathBuf {
    let mut task_dir: Option<PathBuf> = None;
    let mut cursor = PathBuf::new();
    for component in folder.components() {
        cursor.push(component.as_os_str());
        let Component::Normal(part) = component else {
            continue;
        };
        if task_folder_pattern().is_match(&part.to_string_lossy()) {
            task_dir = Some(cursor.clone());
            break;
        }
    }
    if let Some(dir) = task_dir {
        return dir;
    }

    let base = file_name_string(folder);
    match folder.parent() {
        Some(parent) if ArchiveKind::from_dir_name(&base).is_some() => parent.to_path_buf(),
        _ => folder.to_path_buf(),
    }
}

pub fn archive_file_name(site: &str, kind: Option<ArchiveKind>, at: &DateTime<Local>) -> String {
    let stamp = at.format("%d.%m.%Y.%H.%M");
    match kind {
        Some(kind) => format!("backup_{site}_{}_{stamp}.zip", kind.as_str()),
        None => format!("backup_{site}_{stamp}.zip"),
    }
}

fn collect_files(folder: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(folder).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", folder.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(folder)
            .with_context(|| format!("{} escapes {}", entry.path().display(), folder.display()))?;
        let name = normal_segments(relative).join("/");
        out.push((entry.path().to_path_buf(), name));
    }
    out.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(out)
}

pub fn build_archive(
    folder: &Path,
    backup_root: &Path,
    mapping: &FolderMap,
    kind: Option<ArchiveKind>,
    at: &DateTime<Local>,
) -> Result<ArchiveOutcome> {
    if !folder.is_dir() {
        return Err(MirrorError::MissingFolder(folder.display().to_string()).into());
    }

    let site = archive_site_name(folder, backup_root, mapping);
    let placement = archive_placement(folder);
    let archive_path = placement.join(archive_file_name(&site, kind, at));
    fs::create_dir_all(&placement)
        .with_context(|| format!("failed to create {}", placement.display()))?;

    // Collected before the archive exists, so it never contains itself.
    let entries = collect_files(folder)?;

    let file = fs::File::create(&archive_path)
        .with_context(|| format!("failed to create {}", archive_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (full_path, name) in &entries {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("failed to add {name} to archive"))?;
        let mut source = fs::File::open(full_path)
            .with_context(|| format!("failed to open {}", full_path.display()))?;
        io::copy(&mut source, &mut zip)
            .with_context(|| format!("failed to compress {}", full_path.display()))?;
    }
    zip.finish()
        .with_context(|| format!("failed to finalize {}", archive_path.display()))?;

    audit::record(
        &backup_root.join(crate::mirror::paths::LOGS_DIR),
        "archive",
        "ok",
        &format!("{} files -> {}", entries.len(), archive_path.display()),
    );

    Ok(ArchiveOutcome {
        archive_path,
        site,
        files: entries.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;
    use tempfile::tempdir;

    fn at() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 9, 14, 7, 0)
            .single()
            .expect("local time")
    }

    #[test]
    fn file_name_carries_site_kind_and_stamp() {
        assert_eq!(
            archive_file_name("shop", Some(ArchiveKind::Before), &at()),
            "backup_shop_before_09.05.2024.14.07.zip"
        );
        assert_eq!(
            archive_file_name("shop", None, &at()),
            "backup_shop_09.05.2024.14.07.zip"
        );
    }

    #[test]
    fn site_name_is_recovered_through_mapping() {
        let root = Path::new("/data/BackUp");
        let mut mapping = FolderMap::new();
        mapping.insert("My Shop".into(), "My_Shop".into());

        let folder = Path::new("/data/BackUp/My_Shop/May 2024/task_1/before");
        assert_eq!(archive_site_name(folder, root, &mapping), "My Shop");
        let unmapped = Path::new("/data/BackUp/other/May 2024");
        assert_eq!(archive_site_name(unmapped, root, &mapping), "other");
        let outside = Path::new("/elsewhere/thing");
        assert_eq!(archive_site_name(outside, root, &mapping), "backup");
    }

    #[test]
    fn placement_prefers_task_folder_then_parent_of_half() {
        assert_eq!(
            archive_placement(Path::new("/b/site/May 2024/task_12/before/css")),
            PathBuf::from("/b/site/May 2024/task_12")
        );
        assert_eq!(
            archive_placement(Path::new("/b/site/May 2024/after")),
            PathBuf::from("/b/site/May 2024")
        );
        assert_eq!(
            archive_placement(Path::new("/b/site/May 2024")),
            PathBuf::from("/b/site/May 2024")
        );
    }

    #[test]
    fn archive_contains_relative_entries_and_not_itself() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path().join("BackUp");
        let month = root.join("shop/May 2024");
        fs::create_dir_all(month.join("before/css")).expect("mkdir");
        fs::create_dir_all(month.join("after")).expect("mkdir");
        fs::write(month.join("before/index.php"), "<?php echo 1;").expect("write");
        fs::write(month.join("before/css/site.css"), "body{}").expect("write");
        fs::write(month.join("after/index.php"), "<?php echo 2;").expect("write");

        let out = build_archive(&month, &root, &FolderMap::new(), None, &at()).expect("archive");
        assert_eq!(out.files, 3);
        assert_eq!(out.archive_path.parent(), Some(month.as_path()));

        let file = fs::File::open(&out.archive_path).expect("open zip");
        let mut zip = zip::ZipArchive::new(file).expect("read zip");
        let mut names: Vec<String> = zip.file_names().map(ToOwned::to_owned).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["after/index.php", "before/css/site.css", "before/index.php"]
        );
        let mut content = String::new();
        zip.by_name("after/index.php")
            .expect("entry")
            .read_to_string(&mut content)
            .expect("read entry");
        assert_eq!(content, "<?php echo 2;");
    }

    #[test]
    fn half_archive_lands_beside_the_half() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path().join("BackUp");
        let before = root.join("shop/task_3/before");
        fs::create_dir_all(&before).expect("mkdir");
        fs::write(before.join("a.txt"), "a").expect("write");

        let out = build_archive(&before, &root, &FolderMap::new(), Some(ArchiveKind::Before), &at())
            .expect("archive");
        assert_eq!(out.archive_path.parent(), Some(root.join("shop/task_3").as_path()));
        assert!(
            file_name_string(&out.archive_path).starts_with("backup_shop_before_")
        );
    }

    #[test]
    fn missing_folder_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        assert!(
            build_archive(&tmp.path().join("nope"), tmp.path(), &FolderMap::new(), None, &at())
                .is_err()
        );
    }
}
