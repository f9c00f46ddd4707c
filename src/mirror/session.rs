use crate::mirror::paths::MirrorPaths;
use crate::mirror::store::{load_document, save_document};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current site and task carried between backup calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSession {
    pub schema_version: u32,
    pub current_site: Option<String>,
    pub current_task: Option<String>,
}

impl BackupSession {
    pub fn set_task(&mut self, task: Option<&str>) {
        self.current_task = task
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned);
    }
}

pub fn load(paths: &MirrorPaths) -> Result<BackupSession> {
    let mut session: BackupSession = load_document(&paths.session_file)?;
    session.schema_version = 1;
    Ok(session)
}

pub fn save(paths: &MirrorPaths, session: &BackupSession) -> Result<PathBuf> {
    save_document(&paths.session_file, session)?;
    Ok(paths.session_file.clone())
}
