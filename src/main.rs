use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Clap;
use stonebox_limiter::{EnvSnapshot, LaunchError, LaunchPlan};
use tracing::error;

/// Applies resource limits from STONEBOX_* variables, then execs STONEBOX_EXEC_ARGS.
#[derive(Debug, Clap)]
#[clap(name = "stonebox-limiter")]
struct Opt {
    /// Reads missing STONEBOX_* variables from a dotenv file
    #[clap(long, value_name = "path")]
    env_file: Option<PathBuf>,

    /// Prints the launch plan as JSON instead of running the target
    #[clap(long)]
    dry_run: bool,
}

fn setup_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_env_filter(filter)
        .with_timer(fmt::time::ChronoLocal::rfc3339())
        .finish()
        .with(ErrorLayer::default())
        .init();
}

fn dry_run(snapshot: &EnvSnapshot) -> Result<(), LaunchError> {
    let plan = LaunchPlan::from_snapshot(snapshot)?;

    let print = || -> Result<()> {
        let stdout = io::stdout();
        let mut stdout_lock = stdout.lock();
        let out = &mut stdout_lock;
        serde_json::to_writer(&mut *out, &plan)?;
        writeln!(out)?;
        Ok(())
    };
    if let Err(err) = print() {
        error!("failed to print launch plan: {:?}", err);
    }
    Ok(())
}

fn main() {
    let opt = Opt::parse();
    setup_tracing();

    let mut snapshot = EnvSnapshot::from_process();
    if let Some(ref path) = opt.env_file {
        snapshot.merge_env_file(path);
    }

    let err = if opt.dry_run {
        match dry_run(&snapshot) {
            Ok(()) => process::exit(0),
            Err(err) => err,
        }
    } else {
        stonebox_limiter::run(snapshot)
    };

    error!("{}", err);
    process::exit(err.exit_code());
}
