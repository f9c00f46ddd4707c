//! Site-name resolution: persisted project-root ledger first, then path heuristics,
//! then an answer supplied by the caller (or the host name).

use crate::mirror::audit;
use crate::mirror::paths::MirrorPaths;
use crate::mirror::relpath::project_root;
use crate::mirror::store::{load_or_empty, save_document};
use crate::mirror::util::normalize_separators;
use crate::mirror::warn::{self, WarnEvent};
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const UNKNOWN_SITE: &str = "unknown_site";

const WEB_ROOT_SEGMENTS: &[&str] = &["www", "public_html", "httpdocs", "htdocs"];

const SOURCE_EXTENSIONS: &[&str] = &[
    "php", "html", "htm", "js", "css", "ts", "jsx", "tsx", "json", "xml", "tpl", "twig", "scss",
    "sass", "less", "sql", "txt", "md", "py", "rb",
];

/// project-root string -> site display name
pub type SiteNameMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePrompt {
    pub file_path: String,
    pub project_root: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteResolution {
    Known(String),
    NeedsInput(SitePrompt),
}

fn heuristic_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?:var/www/|www/|public_html/|local/|htdocs/|home/)([^/]+)")
                .expect("valid marker regex"),
            Regex::new(r"[A-Za-z][A-Za-z0-9+.\-]*://([^/]+)").expect("valid scheme regex"),
            Regex::new(r"/([^/]+)/(?:www|public_html|httpdocs)/").expect("valid parent regex"),
        ]
    })
}

fn looks_like_source_file(segment: &str) -> bool {
    let Some((_, ext)) = segment.rsplit_once('.') else {
        return false;
    };
    SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Guess a site name from the shape of a path.
pub fn suggest_site_name(file_path: &str) -> Option<String> {
    let normalized = normalize_separators(file_path);

    for pattern in heuristic_patterns() {
        if let Some(caps) = pattern.captures(&normalized) {
            let candidate = caps[1].trim();
            if !candidate.is_empty() {
                return Some(candidate.to_string());
            }
        }
    }

    let parts: Vec<&str> = normalized.split('/').collect();
    let last = parts.len().saturating_sub(1);
    for (i, part) in parts.iter().enumerate() {
        let lowered = part.to_ascii_lowercase();
        if WEB_ROOT_SEGMENTS.contains(&lowered.as_str()) && i + 1 < last {
            let next = parts[i + 1];
            if !next.is_empty() {
                return Some(next.to_string());
            }
        }
    }

    parts
        .iter()
        .find(|part| part.contains('.') && !looks_like_source_file(part))
        .map(|part| (*part).to_string())
}

pub fn host_name() -> String {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_SITE.to_string())
}

pub struct SiteResolver<'a> {
    paths: &'a MirrorPaths,
}

impl<'a> SiteResolver<'a> {
    pub fn new(paths: &'a MirrorPaths) -> Self {
        Self { paths }
    }

    pub fn load_map(&self) -> SiteNameMap {
        load_or_empty(&self.paths.site_name_mapping_file, "site")
    }

    pub fn lookup(&self, file_path: &str) -> Option<String> {
        let root = project_root(file_path)?;
        self.load_map().get(&root).cloned()
    }

    pub fn resolve(&self, file_path: &str) -> SiteResolution {
        if let Some(saved) = self.lookup(file_path) {
            return SiteResolution::Known(saved);
        }
        SiteResolution::NeedsInput(SitePrompt {
            file_path: file_path.to_string(),
            project_root: project_root(file_path),
            suggestion: suggest_site_name(file_path),
        })
    }

    /// Apply the caller's answer; blank or missing answers fall back to the host name.
    pub fn complete(&self, prompt: &SitePrompt, answer: Option<&str>) -> String {
        let chosen = answer
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(host_name);
        self.remember(&prompt.file_path, &chosen);
        chosen
    }

    /// Persist project-root -> site for this path; paths without a root are not recorded.
    pub fn remember(&self, file_path: &str, site_name: &str) {
        let Some(root) = project_root(file_path) else {
            return;
        };
        if let Err(err) = self.save_entry(&root, site_name) {
            warn::emit(WarnEvent {
                code: "SITE_MAP_SAVE_FAILED",
                stage: "site",
                action: "save-site-name-mapping",
                site: site_name,
                file: file_path,
                reason: "mapping-not-persisted",
                err: &format!("{err:#}"),
            });
        }
    }

    fn save_entry(&self, root: &str, site_name: &str) -> Result<()> {
        let mut map = self.load_map();
        if map.get(root).map(String::as_str) == Some(site_name) {
            return Ok(());
        }
        map.insert(root.to_string(), site_name.to_string());
        save_document(&self.paths.site_name_mapping_file, &map)?;
        audit::record(
            &self.paths.logs_dir,
            "site",
            "ok",
            &format!("mapped project root {root} -> {site_name}"),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn suggestion_prefers_segment_after_root_marker() {
        assert_eq!(
            suggest_site_name(r"C:\var\www\shop.example.com\index.php").as_deref(),
            Some("shop.example.com")
        );
    }

    #[test]
    fn suggestion_reads_scheme_host() {
        assert_eq!(
            suggest_site_name("ftp://files.example.org/public/index.php").as_deref(),
            Some("files.example.org")
        );
    }

    #[test]
    fn suggestion_uses_parent_of_httpdocs() {
        assert_eq!(
            suggest_site_name("/srv/clients/acme/httpdocs/index.php").as_deref(),
            Some("acme")
        );
    }

    #[test]
    fn suggestion_matches_web_root_case_insensitively() {
        assert_eq!(
            suggest_site_name("/mnt/Sites/WWW/blog/post.php").as_deref(),
            Some("blog")
        );
    }

    #[test]
    fn suggestion_falls_back_to_domain_like_segment() {
        assert_eq!(
            suggest_site_name("/projects/kulakov-wp-loc-3.dev-z.ru/theme/style.css").as_deref(),
            Some("kulakov-wp-loc-3.dev-z.ru")
        );
        assert_eq!(suggest_site_name("/projects/app/style.css"), None);
    }

    #[test]
    fn resolution_prompts_then_remembers_answer() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        let resolver = SiteResolver::new(&paths);
        let file = "/var/www/shop/index.php";

        let SiteResolution::NeedsInput(prompt) = resolver.resolve(file) else {
            panic!("first resolution must ask for input");
        };
        assert_eq!(prompt.project_root.as_deref(), Some("/var/www/"));
        assert_eq!(prompt.suggestion.as_deref(), Some("shop"));

        assert_eq!(resolver.complete(&prompt, Some("  Shop Site ")), "Shop Site");
        assert_eq!(
            resolver.resolve("/var/www/shop/other.php"),
            SiteResolution::Known("Shop Site".to_string())
        );
    }

    #[test]
    fn blank_answer_falls_back_to_host_name() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        let resolver = SiteResolver::new(&paths);
        let SiteResolution::NeedsInput(prompt) = resolver.resolve("/home/dev/app.py") else {
            panic!("expected prompt");
        };
        assert_eq!(resolver.complete(&prompt, Some("   ")), host_name());
        assert_eq!(resolver.complete(&prompt, None), host_name());
    }

    #[test]
    fn paths_without_root_are_never_recorded() {
        let tmp = tempdir().expect("tempdir");
        let paths = MirrorPaths::under(tmp.path());
        let resolver = SiteResolver::new(&paths);
        resolver.remember("/opt/app/main.rs", "app");
        assert!(!paths.site_name_mapping_file.exists());
    }
}
