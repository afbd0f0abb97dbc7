use std::io;

use thiserror::Error;

/// A fatal launch failure. Each variant maps to a stable exit code.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("{} not set", crate::env::EXEC_ARGS)]
    ArgsMissing,

    #[error("failed to parse {}: {reason}", crate::env::EXEC_ARGS)]
    ArgsInvalid { reason: String },

    #[error("Command not found: {program}")]
    NotFound { program: String },

    #[error("failed to exec command {program}: {source}")]
    ExecFailed { program: String, source: io::Error },
}

impl LaunchError {
    pub const ARGS_MISSING: i32 = 120;
    pub const ARGS_INVALID: i32 = 121;
    pub const EXEC_FAILED: i32 = 126;
    pub const NOT_FOUND: i32 = 127;

    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::ArgsMissing => Self::ARGS_MISSING,
            LaunchError::ArgsInvalid { .. } => Self::ARGS_INVALID,
            LaunchError::ExecFailed { .. } => Self::EXEC_FAILED,
            LaunchError::NotFound { .. } => Self::NOT_FOUND,
        }
    }
}
