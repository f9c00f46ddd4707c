use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::mirror::audit;
use crate::mirror::config::load_config;
use crate::mirror::settings::parse_value;

#[derive(Debug, Clone)]
pub enum SettingsAction {
    Get(String),
    Set(String, String),
}

pub fn run(action: &SettingsAction) -> Result<CommandReport> {
    let mut ws = Workspace::open()?;
    let mut report = CommandReport::new("settings");
    report.detail(format!("store={}", ws.settings.describe()));

    match action {
        SettingsAction::Get(key) => match ws.settings.get(key) {
            Some(value) => report.detail(format!("{key}={value}")),
            None => report.detail(format!("{key} is unset")),
        },
        SettingsAction::Set(key, raw) => {
            let previous = ws.settings.get(key);
            let value = parse_value(raw);
            ws.settings.set(key, value.clone())?;

            // Reject values that would leave the configuration unloadable.
            if let Err(err) = load_config(ws.settings.as_ref()) {
                match previous {
                    Some(old) => ws.settings.set(key, old)?,
                    None => ws.settings.remove(key)?,
                }
                report.issue(format!("{err:#}"));
                return Ok(report);
            }

            audit::record(
                &ws.paths.logs_dir,
                "settings",
                "ok",
                &format!("{key}={value}"),
            );
            report.detail(format!("{key}={value}"));
        }
    }
    Ok(report)
}
