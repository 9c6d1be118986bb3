//! The seam between the Runner and however a worker's pipe endpoints
//! actually come into being. [`ProcessSpawner`] is the real thing;
//! tests substitute an in-memory duplex wired directly to
//! `tas_worker::lifecycle::run` running on a background thread, the same
//! way `tas-worker`'s own tests substitute a `Cursor` for a real pipe.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};

use crate::error::RunnerError;

/// One worker's half-duplex channel: the Runner writes requests to
/// `stdin` and reads frames back from `stdout`. Boxed trait objects so
/// [`Runner`](crate::runner::Runner) doesn't care whether they're real
/// pipes or an in-memory stand-in.
pub struct Pipes {
    pub stdin: Box<dyn Write + Send>,
    pub stdout: Box<dyn Read + Send>,
}

/// Per-worker boot parameters, distinct per
/// worker only in `userdir`.
#[derive(Debug, Clone)]
pub struct WorkerBootParams {
    pub iso: String,
    pub savestate: Option<String>,
    pub qtbase: String,
    pub userdir: String,
    pub timeout_ms: u32,
}

/// Knows how to bring one worker's transport into existence and, later,
/// how to tear it down forcibly if it doesn't shut down on its own.
pub trait WorkerSpawner: Send + Sync {
    type Handle: Send;

    fn spawn(&self, id: u32, params: &WorkerBootParams) -> Result<(Self::Handle, Pipes), RunnerError>;

    /// Best-effort kill, used by `stop()` if a worker doesn't exit after
    /// its stdin is closed.
    fn kill(&self, handle: &mut Self::Handle);
}

/// Spawns the actual `worker` binary as a child process with
/// piped stdin/stdout, per-worker stderr inherited for logs only
///.
pub struct ProcessSpawner {
    pub worker_binary: std::path::PathBuf,
}

impl ProcessSpawner {
    pub fn new(worker_binary: impl Into<std::path::PathBuf>) -> ProcessSpawner {
        ProcessSpawner { worker_binary: worker_binary.into() }
    }
}

impl WorkerSpawner for ProcessSpawner {
    type Handle = Child;

    fn spawn(&self, id: u32, params: &WorkerBootParams) -> Result<(Child, Pipes), RunnerError> {
        let mut cmd = Command::new(&self.worker_binary);
        cmd.arg("--id").arg(id.to_string());
        cmd.arg("--iso").arg(&params.iso);
        if let Some(savestate) = &params.savestate {
            cmd.arg("--savestate").arg(savestate);
        }
        cmd.arg("--qtbase").arg(&params.qtbase);
        cmd.arg("--userdir").arg(&params.userdir);
        cmd.arg("--timeout").arg(params.timeout_ms.to_string());
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn { id, source })?;
        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");
        Ok((child, Pipes { stdin: Box::new(stdin), stdout: Box::new(stdout) }))
    }

    fn kill(&self, handle: &mut Child) {
        let _ = handle.kill();
        let _ = handle.wait();
    }
}
