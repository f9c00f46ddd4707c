pub mod archive;
pub mod backup;
pub mod folder;
pub mod prompt;
pub mod recent;
pub mod restore;
pub mod settings;
pub mod site;
pub mod status;
pub mod task;
pub mod tasks;
pub mod versions;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::mirror::config::{MirrorConfig, load_config};
use crate::mirror::paths::{MirrorPaths, resolve_paths};
use crate::mirror::session::{self, BackupSession};
use crate::mirror::settings::{SettingsStore, open_settings, settings_path};
use crate::mirror::snapshot::BackupContext;
use crate::mirror::warn::{self, WarnEvent};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Settings, resolved configuration and derived paths shared by every command.
pub struct Workspace {
    pub settings: Box<dyn SettingsStore>,
    pub config: MirrorConfig,
    pub paths: MirrorPaths,
}

impl Workspace {
    pub fn open() -> Result<Self> {
        let settings = open_settings(settings_path().as_deref());
        let config = load_config(settings.as_ref())?;
        let paths = resolve_paths(&config);
        Ok(Self {
            settings,
            config,
            paths,
        })
    }

    pub fn backup_context(&self) -> BackupContext {
        BackupContext {
            paths: self.paths.clone(),
            create_month_folder: self.config.create_month_folder,
        }
    }

    /// Session state; an unreadable session file starts a fresh session.
    pub fn session(&self) -> BackupSession {
        match session::load(&self.paths) {
            Ok(session) => session,
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "SESSION_LOAD_FAILED",
                    stage: "session",
                    action: "load",
                    site: "",
                    file: &self.paths.session_file.display().to_string(),
                    reason: "starting-fresh-session",
                    err: &format!("{err:#}"),
                });
                BackupSession::default()
            }
        }
    }
}

/// Absolute form of a user-supplied path, without touching the filesystem.
pub fn absolute_path(raw: &Path) -> Result<PathBuf> {
    std::path::absolute(raw).with_context(|| format!("failed to resolve {}", raw.display()))
}
