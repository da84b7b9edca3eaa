//! Local execution layer
//!
//! Worker pool, completion barriers and the shell runner used to execute
//! task bodies on this machine.

mod local;
mod shell;
mod sync;

pub use local::{ExecutionSummary, ExecutorConfig, LocalExecutor};
pub(crate) use local::LocalShared;
pub use shell::{ShellConfig, ShellResult, ShellRunner, default_shell};
pub use sync::{WaitGroup, WaitTicket};
