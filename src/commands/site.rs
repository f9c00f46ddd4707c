use anyhow::Result;
use std::path::PathBuf;

use crate::commands::prompt::ask_site;
use crate::commands::{CommandReport, Workspace, absolute_path};
use crate::mirror::site::{SiteResolution, SiteResolver};
use crate::mirror::util::path_string;

#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub file: PathBuf,
    pub no_prompt: bool,
}

/// How a site name was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteSource {
    Saved,
    Answered,
    Suggested,
    HostName,
}

impl SiteSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Answered => "answered",
            Self::Suggested => "suggested",
            Self::HostName => "host-name",
        }
    }
}

/// Resolve the site for `file_path`, asking on stdin unless `no_prompt` is set.
///
/// With `no_prompt` the heuristic suggestion is taken as the answer.
pub fn choose_site(ws: &Workspace, file_path: &str, no_prompt: bool) -> (String, SiteSource) {
    let resolver = SiteResolver::new(&ws.paths);
    let prompt = match resolver.resolve(file_path) {
        SiteResolution::Known(site) => return (site, SiteSource::Saved),
        SiteResolution::NeedsInput(prompt) => prompt,
    };

    let answer = if no_prompt {
        prompt.suggestion.clone()
    } else {
        ask_site(&prompt, ws.config.prompt_timeout_secs)
    };
    let source = match answer.as_deref() {
        None => SiteSource::HostName,
        Some(a) if Some(a) == prompt.suggestion.as_deref() => SiteSource::Suggested,
        Some(_) => SiteSource::Answered,
    };
    (resolver.complete(&prompt, answer.as_deref()), source)
}

pub fn run(opts: &SiteOptions) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("site");

    let file = path_string(&absolute_path(&opts.file)?);
    let (site, source) = choose_site(&ws, &file, opts.no_prompt);
    report.detail(format!("file={file}"));
    report.detail(format!("site={site}"));
    report.detail(format!("source={}", source.as_str()));
    Ok(report)
}
