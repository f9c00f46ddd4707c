use crate::mirror::config::MirrorConfig;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "backup_config.json";
pub const FOLDER_MAPPING_FILE: &str = "folder_mapping.json";
pub const SITE_NAME_MAPPING_FILE: &str = "site_name_mapping.json";
pub const LOGS_DIR: &str = "logs";
pub const STATE_DIR: &str = "state";

/// Top-level directories under the backup root that never hold site data.
pub const RESERVED_DIRS: &[&str] = &[LOGS_DIR, STATE_DIR];

#[derive(Debug, Clone)]
pub struct MirrorPaths {
    pub backup_root: PathBuf,
    pub ledger_file: PathBuf,
    pub folder_mapping_file: PathBuf,
    pub site_name_mapping_file: PathBuf,
    pub logs_dir: PathBuf,
    pub session_file: PathBuf,
}

impl MirrorPaths {
    pub fn under(backup_root: &Path) -> Self {
        Self {
            backup_root: backup_root.to_path_buf(),
            ledger_file: backup_root.join(LEDGER_FILE),
            folder_mapping_file: backup_root.join(FOLDER_MAPPING_FILE),
            site_name_mapping_file: backup_root.join(SITE_NAME_MAPPING_FILE),
            logs_dir: backup_root.join(LOGS_DIR),
            session_file: backup_root.join(STATE_DIR).join("session.json"),
        }
    }
}

pub fn resolve_paths(cfg: &MirrorConfig) -> MirrorPaths {
    MirrorPaths::under(&cfg.backup_root)
}

pub fn is_reserved_dir(name: &str) -> bool {
    RESERVED_DIRS.contains(&name)
}
