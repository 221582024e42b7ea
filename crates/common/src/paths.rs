//! Filesystem path templating.
//!
//! Host profiles describe where per-app artifacts live with literal token
//! templates (`{repoRoot}`, `{appId}`, `{jobId}`). Rendering is plain text
//! substitution; no other tokens are recognized.

use std::path::{Path, PathBuf};

/// The four templates a host profile must provide.
#[derive(Debug, Clone)]
pub struct PathTemplateSet {
    pub status_spec: String,
    pub status_snapshot: String,
    pub action_catalog: String,
    pub action_job: String,
}

/// Values substituted into a path template.
#[derive(Debug, Clone, Default)]
pub struct TemplateArgs<'a> {
    pub repo_root: &'a str,
    pub app_id: &'a str,
    pub job_id: &'a str,
}

impl<'a> TemplateArgs<'a> {
    pub fn for_app(repo_root: &'a Path, app_id: &'a str) -> Self {
        Self {
            repo_root: repo_root.to_str().unwrap_or(""),
            app_id,
            job_id: "",
        }
    }

    pub fn for_job(repo_root: &'a Path, app_id: &'a str, job_id: &'a str) -> Self {
        Self {
            repo_root: repo_root.to_str().unwrap_or(""),
            app_id,
            job_id,
        }
    }
}

/// Returns true when `template` contains the literal token `{token_name}`.
pub fn template_has_token(template: &str, token_name: &str) -> bool {
    template.contains(&format!("{{{token_name}}}"))
}

/// Renders a template into a concrete path.
pub fn render_template(template: &str, args: &TemplateArgs<'_>) -> PathBuf {
    let rendered = template
        .replace("{repoRoot}", args.repo_root)
        .replace("{appId}", args.app_id)
        .replace("{jobId}", args.job_id);
    PathBuf::from(rendered)
}
