//! The Parallel Runner: an N-worker supervisor that owns
//! worker process lifecycles (boot, program-load, activation, epoch-based
//! reconfiguration), speaks the framed IPC protocol of `tas-ipc` over each
//! worker's pipes, and fans job/result/progress traffic between the
//! caller and the fleet.
//!
//! Parent-side concurrency: one thread per worker owns
//! that worker's half-duplex pipe, a single shared [`queue::JobQueue`]
//! feeds all of them, and results/progress are drained by the caller
//! through short-held locks — no global lock is held across a pipe I/O
//! call.

pub mod control;
pub mod error;
pub mod queue;
pub mod runner;
pub mod transport;

pub use error::RunnerError;
pub use runner::{Runner, RunnerStatus};
pub use transport::{Pipes, ProcessSpawner, WorkerBootParams, WorkerSpawner};
