use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(name = "savemirror")]
#[command(about = "Before/after snapshots of edited site files, grouped by site, month and task")]
#[command(version)]
pub struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Snapshot a file into its site's before/after folders
    Backup(BackupArgs),

    /// Resolve (and remember) the site a file belongs to
    Site(SiteArgs),

    /// Resolve the backup folder key for a site name
    Folder(FolderArgs),

    /// Zip a backup folder
    Archive(ArchiveArgs),

    /// List task folders
    Tasks(TasksArgs),

    /// Most recently backed up files
    Recent(RecentArgs),

    /// Stored before/after copies of a file
    Versions(VersionsArgs),

    /// Copy a stored version back over a file
    Restore(RestoreArgs),

    /// Show or change the session's current task
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },

    /// Resolved paths, configuration and document sizes
    Status,

    /// Read or write a persisted setting
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Debug, Args)]
pub struct BackupArgs {
    pub file: PathBuf,

    /// Site name; skips resolution and prompting
    #[arg(long)]
    pub site: Option<String>,

    /// Task folder; defaults to the session's current task
    #[arg(long)]
    pub task: Option<String>,

    /// auto, before or after
    #[arg(long, default_value = "auto")]
    pub mode: String,

    /// Accept the suggested site name instead of asking
    #[arg(long, default_value_t = false)]
    pub no_prompt: bool,
}

#[derive(Debug, Args)]
pub struct SiteArgs {
    pub file: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_prompt: bool,
}

#[derive(Debug, Args)]
pub struct FolderArgs {
    pub site: String,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    pub folder: PathBuf,

    /// before or after; inferred from the folder name when omitted
    #[arg(long)]
    pub kind: Option<String>,
}

#[derive(Debug, Args)]
pub struct TasksArgs {
    #[arg(long)]
    pub site: Option<String>,
}

#[derive(Debug, Args)]
pub struct RecentArgs {
    #[arg(long, default_value_t = commands::recent::DEFAULT_RECENT_LIMIT)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct VersionsArgs {
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Stored copy to restore
    pub version: PathBuf,

    /// File to overwrite
    pub file: PathBuf,

    #[arg(long)]
    pub site: Option<String>,

    #[arg(long)]
    pub task: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    Show,
    Set { name: String },
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Get { key: String },
    Set { key: String, value: String },
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let state = if report.ok { "ok" } else { "failed" };
    println!("{}: {state}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

fn dispatch(command: Command) -> Result<CommandReport> {
    match command {
        Command::Backup(args) => commands::backup::run(&commands::backup::BackupOptions {
            file: args.file,
            site: args.site,
            task: args.task,
            mode: args.mode,
            no_prompt: args.no_prompt,
        }),
        Command::Site(args) => commands::site::run(&commands::site::SiteOptions {
            file: args.file,
            no_prompt: args.no_prompt,
        }),
        Command::Folder(args) => {
            commands::folder::run(&commands::folder::FolderOptions { site: args.site })
        }
        Command::Archive(args) => commands::archive::run(&commands::archive::ArchiveOptions {
            folder: args.folder,
            kind: args.kind,
        }),
        Command::Tasks(args) => {
            commands::tasks::run(&commands::tasks::TasksOptions { site: args.site })
        }
        Command::Recent(args) => {
            commands::recent::run(&commands::recent::RecentOptions { limit: args.limit })
        }
        Command::Versions(args) => {
            commands::versions::run(&commands::versions::VersionsOptions { file: args.file })
        }
        Command::Restore(args) => commands::restore::run(&commands::restore::RestoreOptions {
            version: args.version,
            file: args.file,
            site: args.site,
            task: args.task,
        }),
        Command::Task { action } => {
            let action = match action {
                TaskCommand::Show => commands::task::TaskAction::Show,
                TaskCommand::Set { name } => commands::task::TaskAction::Set(name),
                TaskCommand::Clear => commands::task::TaskAction::Clear,
            };
            commands::task::run(&action)
        }
        Command::Status => commands::status::run(),
        Command::Settings { action } => {
            let action = match action {
                SettingsCommand::Get { key } => commands::settings::SettingsAction::Get(key),
                SettingsCommand::Set { key, value } => {
                    commands::settings::SettingsAction::Set(key, value)
                }
            };
            commands::settings::run(&action)
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = dispatch(cli.command)?;
    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
