//! Azure DevOps renderer
//!
//! Translates a job into an Azure Pipelines style document: the ordered
//! stage list, then one `script` step per task carrying a display name and,
//! when the task consumed artifacts, a `dependsOn` list of their producers.

use super::renderer::Renderer;
use crate::pipeline::{DependencyLedger, Job, Target, Task};

/// Renderer for Azure DevOps pipelines
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureDevOpsRenderer;

impl AzureDevOpsRenderer {
    /// Creates a new Azure DevOps renderer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::format_push_string)]
    fn render_task(task: &Task, ledger: &DependencyLedger) -> String {
        let mut step = String::new();

        if task.commands.is_empty() {
            step.push_str("- script: ''\n");
        } else {
            step.push_str("- script: |\n");
            for command in &task.commands {
                step.push_str(&format!("    {command}\n"));
            }
        }

        step.push_str(&format!("  name: {}\n", sanitize_identifier(&task.name)));
        step.push_str(&format!("  displayName: {} / {}\n", task.step, task.name));

        let needs = ledger.needs(task.id);
        if !needs.is_empty() {
            let producers = needs
                .iter()
                .map(|producer| sanitize_identifier(&producer.name))
                .collect::<Vec<_>>()
                .join(", ");
            step.push_str(&format!("  dependsOn: [{producers}]\n"));
        }

        step
    }
}

impl Renderer for AzureDevOpsRenderer {
    fn target(&self) -> Target {
        Target::AzureDevops
    }

    #[allow(clippy::format_push_string)]
    fn render(&self, job: &Job, ledger: &DependencyLedger) -> String {
        let mut yaml = String::new();

        yaml.push_str(&format!("# {}\n", job.name));
        yaml.push_str("stages:\n");
        for name in job.step_names() {
            yaml.push_str(&format!("- {name}\n"));
        }

        yaml.push_str("steps:\n");
        for task in job.tasks() {
            yaml.push_str(&Self::render_task(task, ledger));
        }

        yaml
    }
}

/// Azure step names only allow letters, digits and underscores
fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
