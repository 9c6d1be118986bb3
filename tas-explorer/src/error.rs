//! Failure modes owned by the explorer layer itself. Per-job VM/transport
//! failures surface through `ResultRecord` and the retry policy, not this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("context probe job was never observed (runner reported no result)")]
    ContextProbeLost,
    #[error("context probe ran but its context had no enemy-alive-mask key")]
    MissingEnemyMask,
    #[error("seed-probe grid job {job_id} did not complete successfully")]
    SeedProbeGridFailed { job_id: u64 },
}
