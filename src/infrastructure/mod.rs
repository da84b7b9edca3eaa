//! Infrastructure layer
//!
//! Text renderers for hosted CI services, configuration loading and logging.

mod azure_devops;
mod config;
mod gitlab_ci;
mod logging;
mod renderer;

pub use azure_devops::AzureDevOpsRenderer;
pub use config::Config;
pub use gitlab_ci::GitLabRenderer;
pub use logging::init_logging;
pub use renderer::{Renderer, renderer_for};
