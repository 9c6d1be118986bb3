//! Progress Snapshot.

/// Emitted from worker to parent during long `run-until-bp` executions.
/// Last-write-wins per worker; never buffered.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub job_id: u64,
    pub epoch: u32,
    pub phase: u32,
    pub cur_frames: u32,
    pub total_frames: u32,
    pub elapsed_ms: u32,
    pub flags: u32,
    pub text: String,
}

impl ProgressSnapshot {
    pub const TEXT_MAX: usize = 64;
}
