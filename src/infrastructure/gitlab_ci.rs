//! GitLab CI renderer
//!
//! Emits the `stages:` list of a job followed by one GitLab job record per
//! task. Produced artifacts become `artifacts: paths:`; GitLab passes them to
//! later stages on its own, so no `needs:` annotation is written.
//!
//! Task names become top-level YAML keys. Two tasks whose sanitized names
//! collide, within one job or across jobs rendered together, yield duplicate
//! keys; the renderer still emits both records and logs a warning.

use super::renderer::Renderer;
use crate::pipeline::{DependencyLedger, Job, Target, Task};
use ahash::AHashSet;

/// Renderer for GitLab CI configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct GitLabRenderer;

impl GitLabRenderer {
    /// Creates a new GitLab CI renderer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders a single task record
    #[allow(clippy::format_push_string)]
    fn render_task(task: &Task) -> String {
        let mut record = String::new();

        record.push_str(&format!("{}:\n", sanitize_job_name(&task.name)));
        record.push_str(&format!("  stage: {}\n", sanitize_stage_name(&task.step)));

        if task.commands.is_empty() {
            record.push_str("  script: []\n");
        } else {
            record.push_str("  script:\n");
            for command in &task.commands {
                record.push_str(&format!("    - {command}\n"));
            }
        }

        if let Some(artifact) = &task.produces {
            record.push_str("  artifacts:\n");
            record.push_str("    paths:\n");
            for path in artifact.paths() {
                record.push_str(&format!("      - {path}\n"));
            }
        }

        record
    }
}

impl Renderer for GitLabRenderer {
    fn target(&self) -> Target {
        Target::Gitlab
    }

    #[allow(clippy::format_push_string)]
    fn render(&self, job: &Job, _ledger: &DependencyLedger) -> String {
        let mut yaml = String::new();

        yaml.push_str("stages:\n");
        let mut stage_names = AHashSet::new();
        for name in job.step_names() {
            let name = sanitize_stage_name(name);
            if stage_names.insert(name.clone()) {
                yaml.push_str(&format!("  - {name}\n"));
            }
        }

        for key in duplicate_job_keys(job) {
            tracing::warn!(job = %job.name, key = %key, "Duplicate GitLab job key");
        }

        for task in job.tasks() {
            yaml.push('\n');
            yaml.push_str(&Self::render_task(task));
        }

        yaml
    }
}

/// Sanitized task names used by more than one task of `job`
fn duplicate_job_keys(job: &Job) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut duplicates = Vec::new();
    for task in job.tasks() {
        let key = sanitize_job_name(&task.name);
        if !seen.insert(key.clone()) && !duplicates.contains(&key) {
            duplicates.push(key);
        }
    }
    duplicates
}

/// Sanitizes stage name for GitLab CI
fn sanitize_stage_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Sanitizes job name for GitLab CI
fn sanitize_job_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
