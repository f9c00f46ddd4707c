use crate::error::MirrorError;
use crate::mirror::settings::{
    KEY_BACKUP_ROOT, KEY_CREATE_MONTH_FOLDER, KEY_PROMPT_TIMEOUT_SECS, SettingsStore,
};
use anyhow::Result;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub backup_root: PathBuf,
    pub create_month_folder: bool,
    pub prompt_timeout_secs: u64,
}

pub fn default_backup_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Desktop")
        .join("BackUp")
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            backup_root: default_backup_root(),
            create_month_folder: true,
            prompt_timeout_secs: DEFAULT_PROMPT_TIMEOUT_SECS,
        }
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

fn validate(cfg: &MirrorConfig) -> Result<()> {
    if cfg.backup_root.as_os_str().is_empty() {
        return Err(MirrorError::InvalidConfig("backup_root cannot be empty".into()).into());
    }
    if cfg.prompt_timeout_secs == 0 {
        return Err(
            MirrorError::InvalidConfig("prompt_timeout_secs must be >= 1 second".into()).into(),
        );
    }
    Ok(())
}

fn merge_settings(base: &mut MirrorConfig, store: &dyn SettingsStore) {
    if let Some(root) = store.get_string(KEY_BACKUP_ROOT) {
        base.backup_root = PathBuf::from(root);
    }
    if let Some(month) = store.get_bool(KEY_CREATE_MONTH_FOLDER) {
        base.create_month_folder = month;
    }
    if let Some(timeout) = store.get_u64(KEY_PROMPT_TIMEOUT_SECS) {
        base.prompt_timeout_secs = timeout;
    }
}

pub fn load_config(store: &dyn SettingsStore) -> Result<MirrorConfig> {
    let mut cfg = MirrorConfig::default();
    merge_settings(&mut cfg, store);

    cfg.backup_root = env_or_path("SAVEMIRROR_BACKUP_ROOT", cfg.backup_root);
    cfg.create_month_folder =
        env_or_bool("SAVEMIRROR_CREATE_MONTH_FOLDER", cfg.create_month_folder);
    cfg.prompt_timeout_secs =
        env_or_u64("SAVEMIRROR_PROMPT_TIMEOUT_SECS", cfg.prompt_timeout_secs);

    validate(&cfg)?;
    Ok(cfg)
}
