use std::env;
use std::ffi::{OsStr, OsString};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{trace, warn};

pub const MEMORY_LIMIT_MB: &str = "STONEBOX_MEMORY_LIMIT_MB";
pub const PROCESS_LIMIT: &str = "STONEBOX_PROCESS_LIMIT";
pub const EXEC_ARGS: &str = "STONEBOX_EXEC_ARGS";

/// Variables consumed by the shim. They never reach the target's environment.
pub const CONSUMED_VARS: [&str; 3] = [MEMORY_LIMIT_MB, PROCESS_LIMIT, EXEC_ARGS];

/// A one-time copy of the environment the shim works from.
///
/// The process-wide environment is never mutated; the target's envp is built
/// from [`EnvSnapshot::scrubbed_vars`].
#[derive(Debug, Default, Clone)]
pub struct EnvSnapshot {
    pub memory_limit_mb: Option<OsString>,
    pub process_limit: Option<OsString>,
    pub exec_args: Option<OsString>,
    vars: Vec<(OsString, OsString)>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self::from_vars(env::vars_os())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut snapshot = Self::default();
        for (k, v) in vars {
            let (k, v) = (k.into(), v.into());
            match k.to_str() {
                Some(MEMORY_LIMIT_MB) => snapshot.memory_limit_mb = Some(v.clone()),
                Some(PROCESS_LIMIT) => snapshot.process_limit = Some(v.clone()),
                Some(EXEC_ARGS) => snapshot.exec_args = Some(v.clone()),
                _ => {}
            }
            snapshot.vars.push((k, v));
        }
        snapshot
    }

    /// Fills in consumed variables the environment left unset from a dotenv file.
    ///
    /// Best-effort: an unreadable or malformed file is logged and ignored.
    pub fn merge_env_file(&mut self, path: &Path) {
        if let Err(err) = self.try_merge_env_file(path) {
            warn!(path = %path.display(), "{:?}", err);
        }
    }

    fn try_merge_env_file(&mut self, path: &Path) -> Result<()> {
        let iter = dotenv::from_path_iter(path)
            .with_context(|| format!("failed to open env file: path = {}", path.display()))?;

        let mut loaded = Vec::new();
        for item in iter {
            let (k, v) = item
                .with_context(|| format!("failed to parse env file: path = {}", path.display()))?;
            loaded.push((k, v));
        }

        for (k, v) in loaded {
            let slot = match k.as_str() {
                MEMORY_LIMIT_MB => &mut self.memory_limit_mb,
                PROCESS_LIMIT => &mut self.process_limit,
                EXEC_ARGS => &mut self.exec_args,
                _ => continue,
            };
            if non_empty(slot).is_none() {
                trace!(key = %k, "loaded from env file");
                *slot = Some(v.into());
            }
        }
        Ok(())
    }

    pub fn var(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// The inherited environment with every consumed variable removed.
    pub fn scrubbed_vars(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> + '_ {
        self.vars
            .iter()
            .filter(|(k, _)| !is_consumed(k))
            .map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

pub fn is_consumed(key: &OsStr) -> bool {
    CONSUMED_VARS.iter().any(|&name| key == name)
}

/// Empty values count as unset.
pub(crate) fn non_empty(value: &Option<OsString>) -> Option<&OsStr> {
    value.as_deref().filter(|v| !v.is_empty())
}
