use crate::env::{self, EnvSnapshot};

use std::ffi::OsStr;

use anyhow::{Context, Result};
use rlimit::{Resource, Rlim};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub address_space: Option<u64>, // in bytes
    pub max_processes: Option<u64>,
}

impl ResourceLimits {
    /// Parses both limits. A value that cannot be parsed is logged and dropped.
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let address_space = env::non_empty(&snapshot.memory_limit_mb).and_then(|raw| {
            parse_megabytes(raw)
                .context("failed to set memory limit")
                .map_err(|err| warn!("{:#}", err))
                .ok()
        });

        let max_processes = env::non_empty(&snapshot.process_limit).and_then(|raw| {
            parse_count(raw)
                .context("failed to set process limit")
                .map_err(|err| warn!("{:#}", err))
                .ok()
        });

        Self {
            address_space,
            max_processes,
        }
    }

    /// Sets every present limit with soft = hard. Failures are logged and skipped.
    pub fn apply(&self) {
        if let Some(bytes) = self.address_space {
            let ret = set_hard(Resource::AS, "RLIMIT_AS", bytes);
            if let Err(err) = ret.context("failed to set memory limit") {
                warn!("{:#}", err);
            }
        }

        if let Some(n) = self.max_processes {
            let ret = set_hard(Resource::NPROC, "RLIMIT_NPROC", n);
            if let Err(err) = ret.context("failed to set process limit") {
                warn!("{:#}", err);
            }
        }
    }
}

fn set_hard(resource: Resource, name: &str, value: u64) -> Result<()> {
    let rlim = Rlim::from_raw(value);
    resource
        .set(rlim, rlim)
        .with_context(|| format!("setrlimit({}, {})", name, value))?;
    trace!(resource = name, value, "rlimit applied");
    Ok(())
}

fn parse_count(raw: &OsStr) -> Result<u64> {
    let s = raw
        .to_str()
        .with_context(|| format!("value is not valid UTF-8: {:?}", raw))?;
    s.trim()
        .parse::<u64>()
        .with_context(|| format!("invalid integer: {:?}", s))
}

fn parse_megabytes(raw: &OsStr) -> Result<u64> {
    let mb = parse_count(raw)?;
    mb.checked_mul(MIB)
        .with_context(|| format!("memory limit overflows: {} MB", mb))
}
