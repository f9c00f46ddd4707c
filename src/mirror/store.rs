use crate::mirror::util::path_string;
use crate::mirror::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn load_document<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    let parsed = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}

/// Load a document, treating any read or parse failure as empty state.
pub fn load_or_empty<T>(path: &Path, stage: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match load_document(path) {
        Ok(doc) => doc,
        Err(err) => {
            warn::emit(WarnEvent {
                code: "DOCUMENT_LOAD_FAILED",
                stage,
                action: "load",
                site: "",
                file: &path_string(path),
                reason: "treated-as-empty",
                err: &format!("{err:#}"),
            });
            T::default()
        }
    }
}

/// Whole-document rewrite through a sibling temp file and rename.
pub fn save_document<T>(path: &Path, doc: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let data = serde_json::to_string_pretty(doc)?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(format!("{data}\n").as_bytes())
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn missing_document_loads_as_default() {
        let tmp = tempdir().expect("tempdir");
        let doc: BTreeMap<String, String> =
            load_document(&tmp.path().join("absent.json")).expect("load");
        assert!(doc.is_empty());
    }

    #[test]
    fn corrupt_document_is_an_error_but_loads_empty_leniently() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{not json").expect("write");

        assert!(load_document::<BTreeMap<String, String>>(&path).is_err());
        let lenient: BTreeMap<String, String> = load_or_empty(&path, "test");
        assert!(lenient.is_empty());
    }

    #[test]
    fn save_replaces_whole_document_and_leaves_no_temp_files() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested").join("doc.json");

        let mut doc = BTreeMap::new();
        doc.insert("a".to_string(), "1".to_string());
        save_document(&path, &doc).expect("save first");
        doc.clear();
        doc.insert("b".to_string(), "2".to_string());
        save_document(&path, &doc).expect("save second");

        let loaded: BTreeMap<String, String> = load_document(&path).expect("load");
        assert_eq!(loaded, doc);
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.ends_with("}\n"));
        let entries = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .count();
        assert_eq!(entries, 1);
    }
}
