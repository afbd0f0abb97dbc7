#![deny(clippy::all)]

mod command;
mod env;
mod error;
mod exec;
mod limit;

pub use crate::command::Command;
pub use crate::env::{EnvSnapshot, CONSUMED_VARS, EXEC_ARGS, MEMORY_LIMIT_MB, PROCESS_LIMIT};
pub use crate::error::LaunchError;
pub use crate::limit::ResourceLimits;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Everything needed to launch the target, resolved from an [`EnvSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub limits: ResourceLimits,
    pub command: Command,
}

impl LaunchPlan {
    /// Parses limits first (best-effort), then the argument vector (fatal).
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self, LaunchError> {
        let limits = ResourceLimits::from_snapshot(snapshot);
        let command = Command::from_snapshot(snapshot)?;
        Ok(Self { limits, command })
    }
}

/// Applies the limits and replaces the current process with the target.
///
/// Limits are set before the argument vector is parsed, so a limit failure is
/// logged even when the launch itself is refused. Never returns on success;
/// the returned error carries the exit code.
#[tracing::instrument(name = "stonebox", level = "error", skip(snapshot))]
pub fn run(snapshot: EnvSnapshot) -> LaunchError {
    trace!(?snapshot);

    let limits = ResourceLimits::from_snapshot(&snapshot);
    limits.apply();

    let command = match Command::from_snapshot(&snapshot) {
        Ok(command) => command,
        Err(err) => return err,
    };

    trace!(?command);

    exec::replace_image(&command, &snapshot)
}
