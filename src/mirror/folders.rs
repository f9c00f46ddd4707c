//! Site -> folder-key mapping, collision handling and rename detection.

use crate::mirror::audit;
use crate::mirror::normalize::normalize;
use crate::mirror::paths::{MirrorPaths, is_reserved_dir};
use crate::mirror::store::{load_or_empty, save_document};
use crate::mirror::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// site display name -> folder key
pub type FolderMap = BTreeMap<String, String>;

pub const RENAME_SIMILARITY_THRESHOLD: f64 = 0.9;

pub fn month_folder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(January|February|March|April|May|June|July|August|September|October|November|December) \d{4}$",
        )
        .expect("valid month regex")
    })
}

pub fn is_month_folder(name: &str) -> bool {
    month_folder_pattern().is_match(name)
}

fn similarity_segments(name: &str) -> Vec<String> {
    name.to_lowercase()
        .replace(['_', '-'], ".")
        .split('.')
        .map(ToOwned::to_owned)
        .collect()
}

/// Score two folder names between 0.0 and 1.0.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let left = similarity_segments(a);
    let right = similarity_segments(b);
    if left == right {
        return 1.0;
    }
    if left.len() != right.len() {
        return 0.5;
    }
    let matching = left.iter().zip(&right).filter(|(x, y)| x == y).count();
    matching as f64 / left.len().max(right.len()) as f64
}

/// `foo.dev-z.ru` renamed to `foo.dev-z.ru_old`: every segment kept, more appended.
fn is_suffixed_rename(missing: &str, candidate: &str) -> bool {
    let base = similarity_segments(missing);
    let renamed = similarity_segments(candidate);
    renamed.len() > base.len() && renamed[..base.len()] == base[..]
}

pub fn is_rename_candidate(missing: &str, candidate: &str) -> bool {
    name_similarity(missing, candidate) > RENAME_SIMILARITY_THRESHOLD
        || is_suffixed_rename(missing, candidate)
}

fn has_month_subfolder(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry.path().is_dir() && is_month_folder(&entry.file_name().to_string_lossy())
    })
}

/// Site folders currently present under the backup root.
pub fn list_site_dirs(backup_root: &Path) -> Result<Vec<String>> {
    if !backup_root.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(backup_root)
        .with_context(|| format!("failed to read {}", backup_root.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && !is_reserved_dir(&name) {
            out.push(name);
        }
    }
    out.sort();
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRepair {
    pub site: String,
    pub from: String,
    pub to: String,
}

/// Keys that would leave the backup root or land on its bookkeeping dirs.
fn is_usable_key(key: &str) -> bool {
    !matches!(key, "" | "." | "..") && !is_reserved_dir(key)
}

pub struct FolderMapper<'a> {
    paths: &'a MirrorPaths,
}

impl<'a> FolderMapper<'a> {
    pub fn new(paths: &'a MirrorPaths) -> Self {
        Self { paths }
    }

    pub fn load_map(&self) -> FolderMap {
        load_or_empty(&self.paths.folder_mapping_file, "folder")
    }

    /// Resolve the folder key for a site; I/O failures degrade to the normalized name.
    pub fn resolve(&self, site_name: &str) -> String {
        match self.try_resolve(site_name) {
            Ok(key) => key,
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "FOLDER_RESOLVE_FAILED",
                    stage: "folder",
                    action: "resolve-folder",
                    site: site_name,
                    file: &self.paths.folder_mapping_file.display().to_string(),
                    reason: "using-normalized-name",
                    err: &format!("{err:#}"),
                });
                let key = normalize(site_name);
                if is_usable_key(&key) {
                    key
                } else {
                    format!("{key}_1")
                }
            }
        }
    }

    pub fn try_resolve(&self, site_name: &str) -> Result<String> {
        let mut map = self.load_map();
        self.repair_renames(&mut map)?;

        if let Some(key) = map.get(site_name) {
            return Ok(key.clone());
        }

        let key = self.allocate_key(site_name, &map);
        map.insert(site_name.to_string(), key.clone());
        save_document(&self.paths.folder_mapping_file, &map)?;
        audit::record(
            &self.paths.logs_dir,
            "folder",
            "ok",
            &format!("mapped site {site_name} -> folder {key}"),
        );
        Ok(key)
    }

    fn allocate_key(&self, site_name: &str, map: &FolderMap) -> String {
        let base = normalize(site_name);
        let claimed: BTreeSet<&str> = map.values().map(String::as_str).collect();
        if is_usable_key(&base) && !claimed.contains(base.as_str()) {
            return base;
        }
        let mut index = 1usize;
        loop {
            let candidate = format!("{base}_{index}");
            if !claimed.contains(candidate.as_str())
                && !self.paths.backup_root.join(&candidate).exists()
            {
                return candidate;
            }
            index += 1;
        }
    }

    /// Re-point mappings whose folder vanished at a renamed folder, when one is found.
    pub fn repair_renames(&self, map: &mut FolderMap) -> Result<Vec<RenameRepair>> {
        let existing = list_site_dirs(&self.paths.backup_root)?;
        let existing_set: BTreeSet<&str> = existing.iter().map(String::as_str).collect();
        let mut repairs = Vec::new();

        let missing: Vec<(String, String)> = map
            .iter()
            .filter(|(_, folder)| !existing_set.contains(folder.as_str()))
            .map(|(site, folder)| (site.clone(), folder.clone()))
            .collect();

        for (site, folder) in missing {
            let claimed: BTreeSet<String> = map.values().cloned().collect();
            let found = existing.iter().find(|candidate| {
                !claimed.contains(candidate.as_str())
                    && is_rename_candidate(&folder, candidate)
                    && has_month_subfolder(&self.paths.backup_root.join(candidate))
            });
            let Some(renamed) = found else {
                continue;
            };

            map.insert(site.clone(), renamed.clone());
            save_document(&self.paths.folder_mapping_file, map)?;
            audit::record(
                &self.paths.logs_dir,
                "folder",
                "renamed",
                &format!("site {site}: folder {folder} -> {renamed}"),
            );
            repairs.push(RenameRepair {
                site,
                from: folder,
                to: renamed.clone(),
            });
        }

        Ok(repairs)
    }
}

/// Recover the display name for a folder key, if any site maps to it.
pub fn site_for_folder(map: &FolderMap, folder_key: &str) -> Option<String> {
    map.iter()
        .find(|(_, key)| key.as_str() == folder_key)
        .map(|(site, _)| site.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::store::load_document;
    use tempfile::tempdir;

    fn write_map(paths: &MirrorPaths, entries: &[(&str, &str)]) {
        let map: FolderMap = entries
            .iter()
            .map(|(s, f)| ((*s).to_string(), (*f).to_string()))
            .collect();
        save_document(&paths.folder_mapping_file, &map).expect("save map");
    }

    #[test]
    fn similarity_matches_reference_cases() {
        assert_eq!(name_similarity("Foo_Bar", "foo-bar"), 1.0);
        assert_eq!(name_similarity("foo.dev-z.ru", "foo.dev-z.ru_old"), 0.5);
        let s = name_similarity("kulakov-wp-loc-3.dev-z.ru", "kualkov-bitrix-loc-3.dev-z.ru");
        assert!(s <= RENAME_SIMILARITY_THRESHOLD, "{s}");
        assert!(!is_rename_candidate(
            "kulakov-wp-loc-3.dev-z.ru",
            "kualkov-bitrix-loc-3.dev-z.ru"
        ));
        assert!(is_rename_candidate("foo.dev-z.ru", "foo.dev-z.ru_old"));
        assert!(!is_rename_candidate("foo.dev-z.ru_old", "foo.dev-z.ru"));
    }

    #[test]
    fn month_folder_pattern_requires_full_name_and_year() {
        assert!(is_month_folder("January 2024"));
        assert!(!is_month_folder("Jan 2024"));
        assert!(!is_month_folder("january 2024"));
        assert!(!is_month_folder("January 24"));
    }

    #[test]
    fn resolve_is_idempotent() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        let mapper = FolderMapper::new(&paths);

        let first = mapper.resolve("shop.example.com");
        fs::create_dir_all(paths.backup_root.join(&first)).expect("mkdir");
        let second = mapper.resolve("shop.example.com");
        assert_eq!(first, "shop.example.com");
        assert_eq!(first, second);
        assert_eq!(list_site_dirs(&paths.backup_root).expect("list").len(), 1);
    }

    #[test]
    fn colliding_normalized_names_get_numeric_suffix() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        let mapper = FolderMapper::new(&paths);

        assert_eq!(mapper.resolve("my site"), "my_site");
        fs::create_dir_all(paths.backup_root.join("my_site")).expect("mkdir");
        assert_eq!(mapper.resolve("my/site"), "my_site_1");
        fs::create_dir_all(paths.backup_root.join("my_site_1")).expect("mkdir");
        assert_eq!(mapper.resolve("my:site"), "my_site_2");
        assert_eq!(mapper.resolve("my site"), "my_site");
    }

    #[test]
    fn dot_names_never_become_folder_keys() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(&tmp.path().join("nest/BackUp"));
        let mapper = FolderMapper::new(&paths);

        assert_eq!(mapper.resolve(".."), ".._1");
        assert_eq!(mapper.resolve("."), "._1");
    }

    #[test]
    fn reserved_dir_names_get_numeric_suffix() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        let mapper = FolderMapper::new(&paths);

        assert_eq!(mapper.resolve("logs"), "logs_1");
        assert_eq!(mapper.resolve("state"), "state_1");

        // A similar unclaimed folder with month evidence must not take the site over.
        fs::create_dir_all(paths.backup_root.join("logs_1/January 2024")).expect("mkdir");
        fs::create_dir_all(paths.backup_root.join("logs_old/January 2024")).expect("mkdir");
        assert_eq!(mapper.resolve("logs"), "logs_1");
    }

    #[test]
    fn unclaimed_existing_folder_is_reused() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        fs::create_dir_all(paths.backup_root.join("legacy.site")).expect("mkdir");
        let mapper = FolderMapper::new(&paths);
        assert_eq!(mapper.resolve("legacy.site"), "legacy.site");
    }

    #[test]
    fn renamed_folder_with_month_evidence_is_adopted() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        write_map(&paths, &[("foo.dev-z.ru", "foo.dev-z.ru")]);
        fs::create_dir_all(paths.backup_root.join("foo.dev-z.ru_old/January 2024"))
            .expect("mkdir");

        let mapper = FolderMapper::new(&paths);
        assert_eq!(mapper.resolve("foo.dev-z.ru"), "foo.dev-z.ru_old");
        let saved: FolderMap = load_document(&paths.folder_mapping_file).expect("load");
        assert_eq!(
            saved.get("foo.dev-z.ru").map(String::as_str),
            Some("foo.dev-z.ru_old")
        );
    }

    #[test]
    fn rename_requires_month_subfolder() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        write_map(&paths, &[("foo.dev-z.ru", "foo.dev-z.ru")]);
        fs::create_dir_all(paths.backup_root.join("foo.dev-z.ru_old/task_12")).expect("mkdir");

        let mapper = FolderMapper::new(&paths);
        assert_eq!(mapper.resolve("foo.dev-z.ru"), "foo.dev-z.ru");
    }

    #[test]
    fn dissimilar_sites_are_not_treated_as_renames() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        write_map(&paths, &[("kulakov-wp-loc-3.dev-z.ru", "kulakov-wp-loc-3.dev-z.ru")]);
        fs::create_dir_all(paths.backup_root.join("kualkov-bitrix-loc-3.dev-z.ru/May 2024"))
            .expect("mkdir");

        let mapper = FolderMapper::new(&paths);
        assert_eq!(
            mapper.resolve("kulakov-wp-loc-3.dev-z.ru"),
            "kulakov-wp-loc-3.dev-z.ru"
        );
    }

    #[test]
    fn folder_claimed_by_another_site_is_never_stolen() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        write_map(
            &paths,
            &[("foo.ru", "foo.ru"), ("foo.ru old", "foo.ru_old")],
        );
        fs::create_dir_all(paths.backup_root.join("foo.ru_old/March 2024")).expect("mkdir");

        let mapper = FolderMapper::new(&paths);
        assert_eq!(mapper.resolve("foo.ru"), "foo.ru");
        assert_eq!(mapper.resolve("foo.ru old"), "foo.ru_old");
    }

    #[test]
    fn site_for_folder_reverses_mapping() {
        let mut map = FolderMap::new();
        map.insert("My Shop".into(), "My_Shop".into());
        assert_eq!(site_for_folder(&map, "My_Shop").as_deref(), Some("My Shop"));
        assert_eq!(site_for_folder(&map, "other"), None);
    }
}
