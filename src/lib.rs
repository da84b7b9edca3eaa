//! # Jobline - declare CI jobs once, render or run them anywhere
//!
//! Jobline is a small embedded DSL for describing a build as jobs, steps and
//! tasks. The same declaration can be rendered to GitLab CI or Azure DevOps
//! configuration text, or executed directly on the local machine.
//!
//! ## Quick Start
//!
//! ```
//! use jobline::prelude::*;
//!
//! # fn main() -> Result<(), PipelineError> {
//! let mut builder = Builder::gitlab();
//! builder.job("JobName", |job| {
//!     job.step("Stage1", |step| {
//!         step.task("A", |t| {
//!             t.sh("echo A");
//!             Ok(())
//!         })?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! let yaml = builder.finish()?.to_string();
//! assert!(yaml.starts_with("stages:\n  - Stage1\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **One declaration, many backends**: GitLab CI, Azure DevOps, local execution
//! - **Artifact edges**: tasks produce and consume named artifacts; renderers
//!   turn the edges into dependency annotations
//! - **Chaining**: `and_then` orders tasks and steps on the local executor
//! - **Observability**: structured `tracing` spans for every dispatched task

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod dsl;
pub mod executor;
pub mod infrastructure;
pub mod pipeline;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use dsl::{Builder, JobContext, JobHandle, PipelineOutput, StepContext, TaskContext};
pub use executor::{ExecutionSummary, ExecutorConfig, LocalExecutor, ShellConfig, ShellResult};
pub use infrastructure::{AzureDevOpsRenderer, Config, GitLabRenderer, Renderer, init_logging};
pub use pipeline::{
    Artifact, ArtifactSlot, DeclarationError, DependencyLedger, ExecutionError, Job,
    PipelineError, Step, Target, Task, TaskId, TaskState,
};

/// Version of the jobline crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
