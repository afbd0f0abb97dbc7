use crate::env::{self, EnvSnapshot};
use crate::error::LaunchError;

use std::convert::TryFrom;
use std::ffi::OsStr;

use serde::{Deserialize, Serialize};

/// The target's argument vector. `argv[0]` is also the program to search for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Command {
    argv: Vec<String>,
}

impl Command {
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self, LaunchError> {
        match env::non_empty(&snapshot.exec_args) {
            Some(raw) => Self::from_json(raw),
            None => Err(LaunchError::ArgsMissing),
        }
    }

    /// Decodes a JSON array of strings. Anything else is rejected.
    pub fn from_json(raw: &OsStr) -> Result<Self, LaunchError> {
        let invalid = |reason: String| LaunchError::ArgsInvalid { reason };

        let s = raw
            .to_str()
            .ok_or_else(|| invalid("value is not valid UTF-8".into()))?;

        let argv: Vec<String> = serde_json::from_str(s).map_err(|e| invalid(e.to_string()))?;
        Self::try_from(argv)
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl TryFrom<Vec<String>> for Command {
    type Error = LaunchError;

    fn try_from(argv: Vec<String>) -> Result<Self, Self::Error> {
        let invalid = |reason: String| LaunchError::ArgsInvalid { reason };

        if argv.is_empty() {
            return Err(invalid("argument vector is empty".into()));
        }
        if let Some(arg) = argv.iter().find(|a| a.contains('\0')) {
            return Err(invalid(format!("argument contains a NUL byte: {:?}", arg)));
        }

        Ok(Self { argv })
    }
}

impl From<Command> for Vec<String> {
    fn from(command: Command) -> Self {
        command.argv
    }
}
