use crate::mirror::util::now_timestamp;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const AUDIT_LOG_FILE: &str = "audit.log";

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at: String,
    pub phase: String,
    pub status: String,
    pub message: String,
}

pub fn append_event(logs_dir: &Path, phase: &str, status: &str, message: &str) -> Result<()> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create {}", logs_dir.display()))?;
    let event = AuditEvent {
        at: now_timestamp(),
        phase: phase.to_string(),
        status: status.to_string(),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let path = logs_dir.join(AUDIT_LOG_FILE);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Best-effort variant: a failing audit log never fails the operation it records.
pub fn record(logs_dir: &Path, phase: &str, status: &str, message: &str) {
    let _ = append_event(logs_dir, phase, status, message);
}
