//! Text renderer contract
//!
//! A renderer turns one finished [`Job`] into the configuration text of a
//! hosted CI service. Renderers are pure: identical declarations always yield
//! byte-identical output.

use crate::pipeline::{DependencyLedger, Job, Target};

/// Backend that emits CI configuration text
pub trait Renderer: Send + Sync {
    /// Target this renderer produces
    fn target(&self) -> Target;

    /// Renders a job, using `ledger` for dependency annotations
    fn render(&self, job: &Job, ledger: &DependencyLedger) -> String;
}

/// Returns the renderer for a text target, `None` for [`Target::Local`]
#[must_use]
pub fn renderer_for(target: Target) -> Option<Box<dyn Renderer>> {
    match target {
        Target::Gitlab => Some(Box::new(super::GitLabRenderer::new())),
        Target::AzureDevops => Some(Box::new(super::AzureDevOpsRenderer::new())),
        Target::Local => None,
    }
}
