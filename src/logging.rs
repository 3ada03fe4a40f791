// tracing subscriber setup for binaries and tests embedding the engine

use tracing_subscriber::EnvFilter;

use crate::error::{WorkflowError, WorkflowResult};

/// Install a global `fmt` subscriber filtered by `RUST_LOG` plus
/// `default_directive` (e.g. `scanflow=info`).
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init_tracing(default_directive: &str) -> WorkflowResult<()> {
    let directive = default_directive
        .parse()
        .map_err(|e| WorkflowError::Config(format!("invalid log filter: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .map_err(|e| WorkflowError::Config(e.to_string()))
}
