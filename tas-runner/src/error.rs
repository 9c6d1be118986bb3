//! Failure modes owned by the Runner itself. Per-job transport failures are
//! reported through `ResultRecord::rejected`, not this type; `RunnerError`
//! is for operations that fail outright (spawn, broadcast ack collection).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn worker {id}: {source}")]
    Spawn { id: u32, source: std::io::Error },
    #[error("worker {id} did not become ready within the boot timeout")]
    ReadyTimeout { id: u32 },
    #[error("worker {id} reported a non-ok ready state: {state}")]
    BootFailed { id: u32, state: u8 },
    #[error("worker {id} transport error during boot: {source}")]
    BootTransport { id: u32, source: tas_ipc::IpcError },
    #[error("worker {id} sent an unexpected frame during boot")]
    UnexpectedFrame { id: u32 },
    #[error("the job queue is closed")]
    QueueClosed,
}
