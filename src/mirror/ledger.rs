//! The backup ledger: relative path -> first/last backup time, owning site, snapshot dir.
//!
//! Keys are relative paths only, so the same relative path under two sites or
//! tasks shares one entry.

use crate::mirror::paths::MirrorPaths;
use crate::mirror::store::{load_or_empty, save_document};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(default)]
    pub first_backup_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_time: Option<String>,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub backup_dir: String,
}

impl LedgerEntry {
    pub fn latest_time(&self) -> &str {
        self.last_backup_time
            .as_deref()
            .unwrap_or(&self.first_backup_time)
    }
}

pub type Ledger = BTreeMap<String, LedgerEntry>;

pub fn load(paths: &MirrorPaths) -> Ledger {
    load_or_empty(&paths.ledger_file, "ledger")
}

pub fn save(paths: &MirrorPaths, ledger: &Ledger) -> Result<()> {
    save_document(&paths.ledger_file, ledger)
}

/// Most recently touched entries first.
pub fn recent_backups(ledger: &Ledger, limit: usize) -> Vec<(String, LedgerEntry)> {
    let mut entries: Vec<(String, LedgerEntry)> = ledger
        .iter()
        .map(|(key, entry)| (key.clone(), entry.clone()))
        .collect();
    // Timestamps are zero-padded, so string order is time order.
    entries.sort_by(|a, b| {
        b.1.latest_time()
            .cmp(a.1.latest_time())
            .then_with(|| a.0.cmp(&b.0))
    });
    entries.truncate(limit);
    entries
}
