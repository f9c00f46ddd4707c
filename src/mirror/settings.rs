//! Key-value settings with a persisted TOML variant and an in-memory fallback.

use crate::mirror::util::path_string;
use crate::mirror::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use toml::Value;

pub const KEY_BACKUP_ROOT: &str = "backup_root";
pub const KEY_CREATE_MONTH_FOLDER: &str = "create_month_folder";
pub const KEY_PROMPT_TIMEOUT_SECS: &str = "prompt_timeout_secs";

pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn describe(&self) -> String;

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key)?.as_integer().and_then(|v| u64::try_from(v).ok())
    }
}

#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse settings {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    fn save(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let data = toml::to_string_pretty(&self.values)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, Value>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub fn settings_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("SAVEMIRROR_SETTINGS_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".config").join("savemirror").join("settings.toml"))
}

/// Open the persisted store, falling back to memory when it cannot be loaded.
pub fn open_settings(path: Option<&Path>) -> Box<dyn SettingsStore> {
    let Some(path) = path else {
        return Box::new(MemorySettings::new());
    };
    match FileSettings::load(path) {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn::emit(WarnEvent {
                code: "SETTINGS_LOAD_FAILED",
                stage: "settings",
                action: "open",
                site: "",
                file: &path_string(path),
                reason: "using-in-memory-settings",
                err: &format!("{err:#}"),
            });
            Box::new(MemorySettings::new())
        }
    }
}

/// Interpret a command-line value: booleans and integers keep their type.
pub fn parse_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Integer(n);
    }
    Value::String(trimmed.to_string())
}
