use crate::command::Command;
use crate::env::EnvSnapshot;
use crate::error::LaunchError;

use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::{io, ptr};

use nix::errno::Errno;
use tracing::trace;

const DEFAULT_PATH: &str = "/bin:/usr/bin";

struct ExecveArgs {
    _cstrings: Vec<CString>,
    args: Vec<*const libc::c_char>,
    env: Vec<*const libc::c_char>,
}

fn prepare_execve_args(command: &Command, snapshot: &EnvSnapshot) -> io::Result<ExecveArgs> {
    let mut cstrings = Vec::new();
    let mut args = Vec::new();
    let mut env = Vec::new();

    for a in command.argv() {
        let c = CString::new(a.as_bytes())?;
        args.push(c.as_ptr());
        cstrings.push(c);
    }
    args.push(ptr::null());

    for (k, v) in snapshot.scrubbed_vars() {
        let mut e = Vec::with_capacity(k.len() + v.len() + 1);
        e.extend_from_slice(k.as_bytes());
        e.push(b'=');
        e.extend_from_slice(v.as_bytes());
        let c = CString::new(e)?;
        env.push(c.as_ptr());
        cstrings.push(c);
    }
    env.push(ptr::null());

    Ok(ExecveArgs {
        _cstrings: cstrings,
        args,
        env,
    })
}

/// Paths to try, in order. A program containing a slash is used as is.
fn candidates(program: &str, path: Option<&OsStr>) -> io::Result<Vec<CString>> {
    if program.contains('/') {
        return Ok(vec![CString::new(program)?]);
    }

    let path = path.unwrap_or_else(|| OsStr::new(DEFAULT_PATH));
    let mut files = Vec::new();
    for dir in path.as_bytes().split(|&b| b == b':') {
        let mut file = dir.to_vec();
        if !file.is_empty() && !file.ends_with(b"/") {
            file.push(b'/');
        }
        file.extend_from_slice(program.as_bytes());
        files.push(CString::new(file)?);
    }
    Ok(files)
}

/// Replaces the current process image with `command`.
///
/// The program is searched in `PATH` unless it contains a slash. Each
/// candidate goes straight to `execve(2)`, so a file the kernel refuses
/// (`ENOEXEC`, `EACCES`, ...) is reported instead of being handed to a shell.
/// The target inherits open fds, rlimits and the scrubbed environment. Only
/// returns on failure.
pub fn replace_image(command: &Command, snapshot: &EnvSnapshot) -> LaunchError {
    let program = command.program().to_owned();

    let prepared = prepare_execve_args(command, snapshot)
        .and_then(|exec| Ok((exec, candidates(&program, snapshot.var("PATH"))?)));
    let (exec, files) = match prepared {
        Ok(prepared) => prepared,
        Err(source) => return LaunchError::ExecFailed { program, source },
    };

    trace!(argv = ?command.argv(), candidates = files.len(), "execve");

    // ENOENT and ENOTDIR only mean "not in this directory"; the first other
    // error wins.
    let mut saved: Option<io::Error> = None;
    let mut last = io::Error::from_raw_os_error(libc::ENOENT);
    for file in &files {
        unsafe { libc::execve(file.as_ptr(), exec.args.as_ptr(), exec.env.as_ptr()) };

        let err = io::Error::last_os_error();
        trace!(file = ?file, %err, "execve failed");
        match err.raw_os_error().map(Errno::from_i32) {
            Some(Errno::ENOENT) | Some(Errno::ENOTDIR) => last = err,
            _ => {
                if saved.is_none() {
                    saved = Some(err);
                }
            }
        }
    }

    let err = saved.unwrap_or(last);
    match err.raw_os_error().map(Errno::from_i32) {
        Some(Errno::ENOENT) => LaunchError::NotFound { program },
        _ => LaunchError::ExecFailed {
            program,
            source: err,
        },
    }
}
