//! Post-operation notifier.
//!
//! When configured, an external program is run after each successful operation. The operation
//! verb and the absolute path of the affected file are passed in the environment of the child
//! process:
//!
//! * `HOOK_METHOD` - one of `GET`, `PUT`, `DELETE`
//! * `HOOK_PATH` - absolute path of the file
//!
//! The program runs on its own thread. Its exit status never reaches the HTTP client, and the
//! server does not wait for it. In verbose mode its stdout and stderr are logged together, in the
//! order the program wrote them.
use std::fs;
use std::io::{
    self,
    Read,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{
    Path,
    PathBuf,
};
use std::process::{
    Command,
    ExitStatus,
    Stdio,
};
use std::thread::{
    self,
    JoinHandle,
};

use log::{debug, info, warn};

use crate::settings::{
    ConfigError,
    Operation,
};

pub const ENV_METHOD: &str = "HOOK_METHOD";
pub const ENV_PATH: &str = "HOOK_PATH";

#[derive(Debug, Clone)]
pub struct Notifier {
    program: PathBuf,
    verbose: bool,
    reads: bool,
}

impl Notifier {

    pub fn new(program: impl Into<PathBuf>, verbose: bool) -> Notifier {
        Notifier {
            program: program.into(),
            verbose,
            reads: false,
        }
    }

    /// Also notify after successful reads.
    pub fn with_reads(mut self, reads: bool) -> Notifier {
        self.reads = reads;
        self
    }

    /// Startup check: the program must exist, not be a directory, and have an executable bit.
    pub fn check(program: &Path) -> Result<(), ConfigError> {
        let meta = match fs::metadata(program) {
            Ok(v) => v,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Err(ConfigError::HookMissing(program.to_path_buf()));
                }
                return Err(ConfigError::Io(e));
            },
        };
        if meta.is_dir() {
            return Err(ConfigError::HookIsDirectory(program.to_path_buf()));
        }
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(ConfigError::HookNotExecutable(program.to_path_buf()));
        }
        Ok(())
    }

    pub fn wants(&self, op: Operation) -> bool {
        op.is_mutation() || self.reads
    }

    /// Run the program for `op` on `path` on a detached thread.
    ///
    /// Returns `None` when the operation is not one that is notified. The handle is only
    /// useful to tests; the server drops it.
    pub fn notify(&self, op: Operation, path: &Path) -> Option<JoinHandle<()>> {
        if !self.wants(op) {
            return None;
        }
        let program = self.program.clone();
        let verbose = self.verbose;
        let path = absolute(path);
        debug!("post-hook {:?} for {} {:?}", program, op, path);
        let spawned = thread::Builder::new()
            .name("post-hook".to_string())
            .spawn(move || {
                run(&program, op, &path, verbose);
            });
        match spawned {
            Ok(h) => Some(h),
            Err(e) => {
                if self.verbose {
                    warn!("post-hook thread error: {}", e);
                }
                None
            },
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Run `cmd` with stdout and stderr sharing one pipe, so the output keeps the order the
/// program wrote it in.
fn combined_output(mut cmd: Command) -> io::Result<(ExitStatus, Vec<u8>)> {
    let (mut reader, writer) = os_pipe::pipe()?;
    let writer_err = writer.try_clone()?;
    cmd.stdout(writer);
    cmd.stderr(writer_err);
    let mut child = cmd.spawn()?;
    // the Command holds the write ends; drop it or the read below never sees EOF
    drop(cmd);

    let mut out: Vec<u8> = vec!();
    reader.read_to_end(&mut out)?;
    let status = child.wait()?;
    Ok((status, out))
}

fn run(program: &Path, op: Operation, path: &Path, verbose: bool) {
    let mut cmd = Command::new(program);
    cmd.env(ENV_METHOD, op.verb());
    cmd.env(ENV_PATH, path);
    cmd.stdin(Stdio::null());
    if !verbose {
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        if let Err(e) = cmd.status() {
            debug!("post-hook error: {}", e);
        }
        return;
    }

    match combined_output(cmd) {
        Ok((status, out)) => {
            if !status.success() {
                warn!("post-hook error: {}", status);
            }
            if !out.is_empty() {
                info!("post-hook output:\n{}", String::from_utf8_lossy(&out));
            }
        },
        Err(e) => {
            warn!("post-hook error: {}", e);
        },
    }
}
