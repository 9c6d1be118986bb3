//! Job and Result Record.

/// `{job_id, epoch, payload}`. `payload` is opaque to the Runner; its
/// first byte tags the program-kind for routing to the correct decoder.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: u64,
    pub epoch: u32,
    pub payload: Vec<u8>,
}

/// `accepted=false` means transport or epoch mismatch; the `ctx` fields
/// below are meaningless in that case. `vm_ok=false` with `ctx` populated
/// means the VM executed but did not hit the expected breakpoint.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub job_id: u64,
    pub epoch: u32,
    pub worker_id: u32,
    pub accepted: bool,
    pub vm_ok: bool,
    pub worker_error: u8,
    /// Serialized Context Store snapshot, in the §4.6 key-type-value wire
    /// format. Decoded lazily by callers that need specific keys.
    pub ctx: Vec<u8>,
}

impl ResultRecord {
    /// A synthetic record for transport/epoch failures: no worker ever ran
    /// the job, so there is no context to report.
    pub fn rejected(job_id: u64, epoch: u32, worker_id: u32) -> ResultRecord {
        ResultRecord {
            job_id,
            epoch,
            worker_id,
            accepted: false,
            vm_ok: false,
            worker_error: 0,
            ctx: Vec::new(),
        }
    }
}
