//! The Phase-Script VM: restores a snapshot, decodes the
//! payload into a fresh Context Store, and interprets the program
//! linearly, op by op, against an [`EmulatorHost`].

use std::collections::HashMap;

use tas_codec::wire::serialize_context;
use tas_context::ContextStore;
use tas_emulator::{EmulatorHost, ProgressTick, StopReason};
use tas_registry::{keys, BreakpointMap};
use tas_types::{InputFrame, Job, OutcomeCode, ResultRecord};

use crate::error::VmError;
use crate::op::{Op, PhaseScript, TimeoutArg, VmProgress};
use crate::predicates;

enum ExecFlow {
    Next,
    Jump(usize),
    Halt,
}

/// Failure-kind numbering used in `ResultRecord::worker_error`.
mod worker_error {
    pub const NONE: u8 = 0;
    pub const PROGRAM_LOAD: u8 = 3;
    pub const RUNTIME: u8 = 4;
    pub const SNAPSHOT: u8 = 6;
}

pub struct Vm<H: EmulatorHost> {
    host: H,
    bp_map: BreakpointMap,
    program: PhaseScript,
    labels: HashMap<&'static str, usize>,
    snapshot: Option<Vec<u8>>,
    default_timeout_ms: u32,
    pending_timeout: Option<u32>,
    /// Per-turn cursor into the flattened plan frame table.
    plan_cursor: u32,
    plan_cursor_turn: Option<u32>,
}

impl<H: EmulatorHost> Vm<H> {
    /// `init(init_params, program)`: optionally loads a
    /// savestate, clears previously-armed breakpoints, arms the program's
    /// canonical breakpoints (deduplicated by pc), and captures a snapshot
    /// of the resulting state.
    pub fn init(
        mut host: H,
        bp_map: BreakpointMap,
        program: PhaseScript,
        savestate_path: Option<&str>,
        default_timeout_ms: u32,
    ) -> Result<Vm<H>, VmError> {
        host.clear_all_pc_breakpoints();

        let mut pcs: Vec<u32> = program
.canonical_bp_keys
.iter()
.filter_map(|k| bp_map.pc(*k))
.collect();
        pcs.sort_unstable();
        pcs.dedup();
        if !pcs.is_empty() && !host.arm_pc_breakpoints(&pcs) {
            return Err(VmError::ArmFailed);
        }

        if let Some(path) = savestate_path {
            if !host.load_savestate(path) {
                return Err(VmError::SnapshotRestoreFailed);
            }
        }

        let snapshot = host
.save_snapshot_to_buffer()
.ok_or(VmError::SnapshotCaptureFailed)?;

        let mut labels = HashMap::new();
        for (idx, op) in program.ops.iter().enumerate() {
            if let Op::Label { name } = op {
                labels.insert(*name, idx);
            }
        }
        for op in &program.ops {
            let referenced = match op {
                Op::Goto { label } => Some(*label),
                Op::GotoIf { label,.. } => Some(*label),
                Op::GotoIfKeys { label,.. } => Some(*label),
                _ => None,
            };
            if let Some(label) = referenced {
                if !labels.contains_key(label) {
                    return Err(VmError::UnknownLabel(label));
                }
            }
        }

        Ok(Vm {
            host,
            bp_map,
            program,
            labels,
            snapshot: Some(snapshot),
            default_timeout_ms,
            pending_timeout: None,
            plan_cursor: 0,
            plan_cursor_turn: None,
        })
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Releases the emulator host back to the caller. Used by the Worker
    /// Process when transitioning from the init program to the main
    /// program: the init Vm's post-run emulator state
    /// becomes the baseline the main Vm captures its own snapshot from.
    pub fn into_host(self) -> H {
        self.host
    }

    /// `run(job) -> Result`: restores the snapshot, decodes
    /// the payload into a fresh context store, and interprets the program
    /// linearly. Every path out of this function returns `accepted: true`
    /// — transport/epoch concerns are the Runner's, not the VM's.
    pub fn run(
        &mut self,
        job: &Job,
        worker_id: u32,
        mut progress: Option<&mut dyn FnMut(VmProgress)>,
    ) -> ResultRecord {
        let snapshot = match self.snapshot.clone() {
            Some(s) => s,
            None => return self.fail(job, worker_id, worker_error::SNAPSHOT, ContextStore::new()),
        };
        if !self.host.load_snapshot_from_buffer(&snapshot) {
            return self.fail(job, worker_id, worker_error::SNAPSHOT, ContextStore::new());
        }

        let mut ctx = ContextStore::new();
        if tas_codec::decode_by_tag(&job.payload, &mut ctx).is_err() {
            return self.fail(job, worker_id, worker_error::PROGRAM_LOAD, ctx);
        }

        let movie_active = ctx.contains(keys::tas_movie::DTM_PATH);
        if movie_active {
            if let Some(path) = ctx.get::<Vec<u8>>(keys::tas_movie::DTM_PATH) {
                self.host.play_movie(&String::from_utf8_lossy(&path));
            }
        }

        let (vm_ok, worker_err) = self.execute_ops(&mut ctx, progress);

        if movie_active {
            self.host.end_movie_playback(self.default_timeout_ms);
        }

        ResultRecord {
            job_id: job.job_id,
            epoch: job.epoch,
            worker_id,
            accepted: true,
            vm_ok,
            worker_error: worker_err,
            ctx: serialize_context(&ctx),
        }
    }

    /// Runs this Vm's program from an empty Context Store with no payload
    /// decode step, for the Worker Process's `run-init-once` handling
    ///: the init program performs one-time per-boot setup
    /// (e.g. establishing a deterministic rand seed) directly against the
    /// freshly-loaded savestate, with no job payload to decode.
    pub fn run_init(
        &mut self,
        job_id: u64,
        worker_id: u32,
        progress: Option<&mut dyn FnMut(VmProgress)>,
    ) -> ResultRecord {
        let snapshot = match self.snapshot.clone() {
            Some(s) => s,
            None => {
                return ResultRecord {
                    job_id,
                    epoch: 0,
                    worker_id,
                    accepted: true,
                    vm_ok: false,
                    worker_error: worker_error::SNAPSHOT,
                    ctx: serialize_context(&ContextStore::new()),
                }
            }
        };
        if !self.host.load_snapshot_from_buffer(&snapshot) {
            return ResultRecord {
                job_id,
                epoch: 0,
                worker_id,
                accepted: true,
                vm_ok: false,
                worker_error: worker_error::SNAPSHOT,
                ctx: serialize_context(&ContextStore::new()),
            };
        }

        let mut ctx = ContextStore::new();
        let (vm_ok, worker_err) = self.execute_ops(&mut ctx, progress);

        ResultRecord {
            job_id,
            epoch: 0,
            worker_id,
            accepted: true,
            vm_ok,
            worker_error: worker_err,
            ctx: serialize_context(&ctx),
        }
    }

    /// The op-execution loop shared by [`Vm::run`] and [`Vm::run_init`]:
    /// resets the per-run cursors, then interprets `self.program.ops`
    /// linearly from pc 0 until a `Halt`, an op error, or falling off the
    /// end of the program (treated as a program-load failure, since a
    /// well-formed program always ends with a `ReturnResult` on every
    /// reachable path).
    fn execute_ops(
        &mut self,
        ctx: &mut ContextStore,
        mut progress: Option<&mut dyn FnMut(VmProgress)>,
    ) -> (bool, u8) {
        self.plan_cursor = 0;
        self.plan_cursor_turn = None;
        self.pending_timeout = None;

        let mut pc = 0usize;
        let mut vm_ok = true;
        let mut worker_err = worker_error::NONE;
        loop {
            if pc >= self.program.ops.len() {
                vm_ok = false;
                worker_err = worker_error::PROGRAM_LOAD;
                break;
            }
            let op = self.program.ops[pc].clone();
            match self.exec_op(&op, ctx, progress.as_deref_mut()) {
                Ok(ExecFlow::Next) => pc += 1,
                Ok(ExecFlow::Jump(target)) => pc = target,
                Ok(ExecFlow::Halt) => break,
                Err(e) => {
                    tracing::warn!(error = %e, op = ?op, "phase-script op failed");
                    vm_ok = false;
                    worker_err = worker_error::RUNTIME;
                    break;
                }
            }
        }
        (vm_ok, worker_err)
    }

    fn fail(&self, job: &Job, worker_id: u32, worker_error: u8, ctx: ContextStore) -> ResultRecord {
        ResultRecord {
            job_id: job.job_id,
            epoch: job.epoch,
            worker_id,
            accepted: true,
            vm_ok: false,
            worker_error,
            ctx: serialize_context(&ctx),
        }
    }

    fn resolve_timeout(&mut self, ctx: &ContextStore) -> u32 {
        self.pending_timeout
.take()
.or_else(|| ctx.get::<u32>(keys::core::RUN_MS))
.unwrap_or(self.default_timeout_ms)
    }

    fn exec_op(
        &mut self,
        op: &Op,
        ctx: &mut ContextStore,
        progress: Option<&mut dyn FnMut(VmProgress)>,
    ) -> Result<ExecFlow, VmError> {
        match op {
            Op::ArmBps => {
                self.host.clear_all_pc_breakpoints();
                let mut pcs: Vec<u32> = self
.program
.canonical_bp_keys
.iter()
.filter_map(|k| self.bp_map.pc(*k))
.collect();
                pcs.sort_unstable();
                pcs.dedup();
                if !pcs.is_empty() && !self.host.arm_pc_breakpoints(&pcs) {
                    return Err(VmError::ArmFailed);
                }
                Ok(ExecFlow::Next)
            }
            Op::LoadSnapshot => {
                let buf = self.snapshot.clone().ok_or(VmError::SnapshotRestoreFailed)?;
                if !self.host.load_snapshot_from_buffer(&buf) {
                    return Err(VmError::SnapshotRestoreFailed);
                }
                Ok(ExecFlow::Next)
            }
            Op::CaptureSnapshot => {
                let buf = self
.host
.save_snapshot_to_buffer()
.ok_or(VmError::SnapshotCaptureFailed)?;
                self.snapshot = Some(buf);
                Ok(ExecFlow::Next)
            }
            Op::ApplyInput { key } => {
                let frame: InputFrame = ctx.get(*key).ok_or(VmError::MissingInputFrame(*key))?;
                self.host.set_input(frame);
                Ok(ExecFlow::Next)
            }
            Op::StepFrames { n } => {
                for _ in 0..*n {
                    if !self.host.step_one_frame_blocking(self.default_timeout_ms) {
                        return Err(VmError::MemoryReadFailed {
                            op: "step-frames",
                            addr: 0,
                        });
                    }
                }
                Ok(ExecFlow::Next)
            }
            Op::RunUntilBp => self.exec_run_until_bp(ctx, progress),
            Op::ReadU8 { addr, dst } => {
                let v = self
.host
.read_u8(*addr)
.ok_or(VmError::MemoryReadFailed { op: "read-u8", addr: *addr })?;
                ctx.set(*dst, v);
                Ok(ExecFlow::Next)
            }
            Op::ReadU16 { addr, dst } => {
                let v = self
.host
.read_u16(*addr)
.ok_or(VmError::MemoryReadFailed { op: "read-u16", addr: *addr })?;
                ctx.set(*dst, v);
                Ok(ExecFlow::Next)
            }
            Op::ReadU32 { addr, dst } => {
                let v = self
.host
.read_u32(*addr)
.ok_or(VmError::MemoryReadFailed { op: "read-u32", addr: *addr })?;
                ctx.set(*dst, v);
                Ok(ExecFlow::Next)
            }
            Op::ReadF32 { addr, dst } => {
                let v = self
.host
.read_f32(*addr)
.ok_or(VmError::MemoryReadFailed { op: "read-f32", addr: *addr })?;
                ctx.set(*dst, v);
                Ok(ExecFlow::Next)
            }
            Op::ReadF64 { addr, dst } => {
                let v = self
.host
.read_f64(*addr)
.ok_or(VmError::MemoryReadFailed { op: "read-f64", addr: *addr })?;
                ctx.set(*dst, v);
                Ok(ExecFlow::Next)
            }
            Op::SetTimeout { arg } => {
                let ms = match arg {
                    TimeoutArg::Literal(ms) => *ms,
                    TimeoutArg::Key(key) => ctx.get::<u32>(*key).unwrap_or(0),
                };
                self.pending_timeout = Some(ms);
                Ok(ExecFlow::Next)
            }
            Op::EmitResult { key } => {
                if !ctx.contains(*key) {
                    return Err(VmError::MissingEmitKey(*key));
                }
                Ok(ExecFlow::Next)
            }
            Op::Label {.. } => Ok(ExecFlow::Next),
            Op::Goto { label } => Ok(ExecFlow::Jump(self.labels[label])),
            Op::GotoIf { key, cmp, literal, label } => {
                let lhs = ctx.get::<u32>(*key).unwrap_or(0) as u64;
                if cmp.apply_u64(lhs, *literal as u64) {
                    Ok(ExecFlow::Jump(self.labels[label]))
                } else {
                    Ok(ExecFlow::Next)
                }
            }
            Op::GotoIfKeys { lhs, cmp, rhs, label } => {
                let a = ctx.get::<u32>(*lhs).unwrap_or(0) as u64;
                let b = ctx.get::<u32>(*rhs).unwrap_or(0) as u64;
                if cmp.apply_u64(a, b) {
                    Ok(ExecFlow::Jump(self.labels[label]))
                } else {
                    Ok(ExecFlow::Next)
                }
            }
            Op::SetU32 { key, value } => {
                ctx.set(*key, *value);
                Ok(ExecFlow::Next)
            }
            Op::AddU32 { key, delta } => {
                let v = ctx.get::<u32>(*key).unwrap_or(0);
                let next = (v as i32).wrapping_add(*delta) as u32;
                ctx.set(*key, next);
                Ok(ExecFlow::Next)
            }
            Op::ApplyPlanFrameFrom { active_turn_key } => {
                self.apply_plan_frame_from(*active_turn_key, ctx)?;
                Ok(ExecFlow::Next)
            }
            Op::ArmBpsFromPredicateTable => {
                predicates::arm_from_table(ctx, &mut self.host, &self.bp_map)?;
                Ok(ExecFlow::Next)
            }
            Op::CapturePredicateBaselines => {
                predicates::capture_baselines(ctx, &self.host)?;
                Ok(ExecFlow::Next)
            }
            Op::EvalPredicatesAtHitBp => {
                let hit_key = ctx.get::<u32>(keys::core::HIT_PC).unwrap_or(0) as u16;
                let _ = predicates::eval_at_hit_bp(ctx, &self.host, hit_key)?;
                Ok(ExecFlow::Next)
            }
            Op::RecordProgressAtBp => {
                if let Some(sink) = progress {
                    let phase = ctx.get::<u32>(keys::core::ACTIVE_TURN).unwrap_or(0);
                    let elapsed = ctx.get::<u32>(keys::core::ELAPSED_MS).unwrap_or(0);
                    sink(VmProgress {
                        phase,
                        cur_frames: elapsed,
                        total_frames: 0,
                        elapsed_ms: elapsed,
                        flags: 0,
                    });
                }
                Ok(ExecFlow::Next)
            }
            Op::ReturnResult { code } => {
                ctx.set(keys::core::OUTCOME_CODE, code.0);
                Ok(ExecFlow::Halt)
            }
        }
    }

    fn exec_run_until_bp(
        &mut self,
        ctx: &mut ContextStore,
        progress: Option<&mut dyn FnMut(VmProgress)>,
    ) -> Result<ExecFlow, VmError> {
        let timeout_ms = self.resolve_timeout(ctx);
        let vi_stall_ms = ctx.get::<u32>(keys::core::VI_STALL_MS).unwrap_or(0);

        let outcome = match progress {
            Some(sink) => {
                let mut adapter = |tick: ProgressTick| {
                    sink(VmProgress {
                        phase: 0,
                        cur_frames: tick.cur_frames,
                        total_frames: tick.total_frames,
                        elapsed_ms: tick.elapsed_ms,
                        flags: 0,
                    });
                };
                self.host
.run_until_breakpoint(timeout_ms, vi_stall_ms, true, Some(&mut adapter))
            }
            None => self.host.run_until_breakpoint(timeout_ms, vi_stall_ms, true, None),
        };

        let (outcome_code, hit_key) = match outcome.reason {
            StopReason::Hit => (OutcomeCode::HIT, self.bp_map.matches(outcome.pc)),
            StopReason::Timeout => (OutcomeCode::TIMEOUT, None),
            StopReason::ViStalled => (OutcomeCode::VI_STALLED, None),
            StopReason::MovieEnded => (OutcomeCode::MOVIE_ENDED, None),
            StopReason::Aborted => (OutcomeCode::ABORTED, None),
        };

        ctx.set(keys::core::OUTCOME_CODE, outcome_code.0);
        ctx.set(keys::core::ELAPSED_MS, outcome.elapsed_ms);
        if let Some(key) = hit_key {
            ctx.set(keys::core::HIT_PC, key as u32);
        }

        // The op never halts execution on its own: which outcomes count as
        // success (a movie ending, a particular bp firing) is a
        // program-specific decision, made with goto-if on core.outcome_code
        // / core.hit_pc downstream.
        Ok(ExecFlow::Next)
    }

    /// `apply-plan-frame-from`: looks up the active turn,
    /// reads the per-turn frame counts and flattened frame table, applies
    /// the next frame, advances the per-plan cursor, and sets
    /// `core.plan_done=1` when the plan is exhausted. The cursor resets
    /// whenever the active turn changes underneath it.
    fn apply_plan_frame_from(&mut self, active_turn_key: u16, ctx: &mut ContextStore) -> Result<(), VmError> {
        let active_turn = ctx.get::<u32>(active_turn_key).unwrap_or(0);
        let counts: Vec<u8> = ctx.get(keys::battle::PLAN_FRAME_COUNTS).unwrap_or_default();
        let table: Vec<u8> = ctx.get(keys::battle::PLAN_FRAME_TABLE).unwrap_or_default();
        let n_plans = counts.len() / 4;

        if active_turn as usize >= n_plans {
            ctx.set(keys::core::PLAN_DONE, 1u32);
            return Ok(());
        }

        let mut frame_offset = 0usize;
        let mut frame_count = 0u32;
        for (i, chunk) in counts.chunks_exact(4).enumerate().take(active_turn as usize + 1) {
            let c = u32::from_le_bytes(chunk.try_into().unwrap());
            if i < active_turn as usize {
                frame_offset += c as usize;
            } else {
                frame_count = c;
            }
        }

        if self.plan_cursor_turn != Some(active_turn) {
            self.plan_cursor = 0;
            self.plan_cursor_turn = Some(active_turn);
        }

        if self.plan_cursor >= frame_count {
            ctx.set(keys::core::PLAN_DONE, 1u32);
            return Ok(());
        }

        let byte_idx = (frame_offset + self.plan_cursor as usize) * InputFrame::WIRE_LEN;
        let raw: [u8; InputFrame::WIRE_LEN] = table
.get(byte_idx..byte_idx + InputFrame::WIRE_LEN)
.ok_or(VmError::MalformedPlanTable("plan frame table index out of range"))?
.try_into()
.unwrap();
        self.host.set_input(InputFrame::from_wire(raw));
        self.plan_cursor += 1;
        ctx.set(
            keys::core::PLAN_DONE,
            if self.plan_cursor >= frame_count { 1u32 } else { 0u32 },
        );
        Ok(())
    }
}
