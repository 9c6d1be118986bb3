//! The closed Op tagged union: branching on it is a table
//! dispatch, not dynamic dispatch.

use tas_types::{Cmp, KeyId, OutcomeCode};

/// `set-timeout(key-or-literal)`: the timeout can be a fixed literal or
/// read from a context key at the moment the op executes.
#[derive(Debug, Clone, Copy)]
pub enum TimeoutArg {
    Literal(u32),
    Key(KeyId),
}

#[derive(Debug, Clone)]
pub enum Op {
    ArmBps,
    LoadSnapshot,
    CaptureSnapshot,
    ApplyInput { key: KeyId },
    StepFrames { n: u32 },
    RunUntilBp,
    ReadU8 { addr: u32, dst: KeyId },
    ReadU16 { addr: u32, dst: KeyId },
    ReadU32 { addr: u32, dst: KeyId },
    ReadF32 { addr: u32, dst: KeyId },
    ReadF64 { addr: u32, dst: KeyId },
    SetTimeout { arg: TimeoutArg },
    EmitResult { key: KeyId },
    Label { name: &'static str },
    Goto { label: &'static str },
    GotoIf { key: KeyId, cmp: Cmp, literal: u32, label: &'static str },
    GotoIfKeys { lhs: KeyId, cmp: Cmp, rhs: KeyId, label: &'static str },
    SetU32 { key: KeyId, value: u32 },
    AddU32 { key: KeyId, delta: i32 },
    ApplyPlanFrameFrom { active_turn_key: KeyId },
    ArmBpsFromPredicateTable,
    CapturePredicateBaselines,
    EvalPredicatesAtHitBp,
    RecordProgressAtBp,
    ReturnResult { code: OutcomeCode },
}

/// `{canonical_bp_keys, ops}`. The bp-key list is armed once
/// per program-load; `ops` is the linear program executed per job.
#[derive(Debug, Clone)]
pub struct PhaseScript {
    pub canonical_bp_keys: Vec<u16>,
    pub ops: Vec<Op>,
}

/// A single progress tick the VM hands to its caller's sink, either
/// forwarded from the emulator host's own polling cadence (`phase = 0`)
/// or emitted explicitly by `record-progress-at-bp` (`phase` = the
/// program's notion of which stage it's in, e.g. the active turn).
#[derive(Debug, Clone, Copy)]
pub struct VmProgress {
    pub phase: u32,
    pub cur_frames: u32,
    pub total_frames: u32,
    pub elapsed_ms: u32,
    pub flags: u32,
}
