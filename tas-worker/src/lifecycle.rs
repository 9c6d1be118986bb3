//! The worker's own state machine: boot, wait-for-program,
//! active, shutdown. Owns exactly one emulator and one VM at a time and
//! never runs two jobs concurrently — the loop below is a single
//! straight-line `read frame, react, write frame` cycle.

use std::io::{Read, Write};

use tas_emulator::EmulatorHost;
use tas_ipc::{
    ack_code, read_frame, write_frame, AckFrame, Frame, IpcError, JobFrame, ProgressFrame,
    ResultFrame, SetProgramFrame,
};
use tas_types::{Job, ProgramKind};
use tas_vm::{programs, Vm, VmProgress};

use crate::boot::boot;
use crate::config::WorkerConfig;
use crate::exit_code;

enum State<H: EmulatorHost> {
    WaitingProgram {
        host: H,
    },
    /// A program set with no init program (`init_kind == 0`): waiting for
    /// `activate-main` to build the main Vm directly.
    MainPending {
        host: H,
        main_kind: ProgramKind,
        timeout_ms: u32,
        savestate_path: Option<String>,
    },
    /// An init program is built and ready for `run-init-once`; the main
    /// Vm is built lazily from the init Vm's post-run host on
    /// `activate-main`.
    InitPending {
        init_vm: Vm<H>,
        main_kind: ProgramKind,
        timeout_ms: u32,
        savestate_path: Option<String>,
    },
    Active {
        vm: Vm<H>,
    },
    /// The worker lost access to a usable host/Vm after a program-load
    /// failure during `set-program`/`activate-main`; the only path
    /// forward is a clean shutdown.
    Dead,
}

fn handle_set_program<H: EmulatorHost>(host: H, frame: &SetProgramFrame) -> (AckFrame, State<H>) {
    let main_kind = ProgramKind(frame.main_kind);
    let init_kind = ProgramKind(frame.init_kind);
    let savestate_path = if frame.savestate_path.is_empty() {
        None
    } else {
        Some(frame.savestate_path.clone())
    };

    if programs::dispatch(main_kind).is_none() {
        return (
            AckFrame { ok: 0, code: ack_code::INVALID },
            State::WaitingProgram { host },
        );
    }

    if init_kind.0 == 0 {
        return (
            AckFrame { ok: 1, code: ack_code::SUCCESS },
            State::MainPending {
                host,
                main_kind,
                timeout_ms: frame.timeout_ms,
                savestate_path,
            },
        );
    }

    let Some((init_bp, init_script)) = programs::dispatch(init_kind) else {
        return (
            AckFrame { ok: 0, code: ack_code::INVALID },
            State::WaitingProgram { host },
        );
    };

    match Vm::init(host, init_bp, init_script, savestate_path.as_deref(), frame.timeout_ms) {
        Ok(init_vm) => (
            AckFrame { ok: 1, code: ack_code::SUCCESS },
            State::InitPending {
                init_vm,
                main_kind,
                timeout_ms: frame.timeout_ms,
                savestate_path,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "init program failed to construct");
            (AckFrame { ok: 0, code: ack_code::INVALID }, State::Dead)
        }
    }
}

fn activate_main<H: EmulatorHost>(
    host: H,
    main_kind: ProgramKind,
    timeout_ms: u32,
    savestate_path: Option<String>,
) -> (AckFrame, State<H>) {
    let Some((main_bp, main_script)) = programs::dispatch(main_kind) else {
        return (AckFrame { ok: 0, code: ack_code::INVALID }, State::Dead);
    };
    match Vm::init(host, main_bp, main_script, savestate_path.as_deref(), timeout_ms) {
        Ok(vm) => (AckFrame { ok: 1, code: ack_code::SUCCESS }, State::Active { vm }),
        Err(e) => {
            tracing::error!(error = %e, "main program failed to construct");
            (AckFrame { ok: 0, code: ack_code::INVALID }, State::Dead)
        }
    }
}

/// Runs the full worker lifecycle against `input`/`output`, returning the
/// process exit code.
pub fn run<H: EmulatorHost, R: Read, W: Write>(cfg: &WorkerConfig, mut host: H, mut input: R, mut output: W) -> i32 {
    let ready = boot(cfg, &mut host);
    let ready_ok = ready.ok == 1;
    let ready_state = ready.state;
    if write_frame(&mut output, &Frame::Ready(ready.clone())).is_err() {
        return exit_code::INVALID_HANDLES;
    }
    if !ready_ok {
        return exit_code::from_ready_state(ready_state);
    }

    let mut state = State::WaitingProgram { host };

    loop {
        let frame = match read_frame(&mut input) {
            Ok(f) => f,
            Err(IpcError::ShortRead {.. }) => {
                tracing::info!("parent closed the pipe, shutting down");
                return exit_code::CLEAN;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport error, shutting down");
                return exit_code::CLEAN;
            }
        };

        state = match (frame, state) {
            (Frame::SetProgram(sp), State::WaitingProgram { host }) => {
                let (ack, next) = handle_set_program(host, &sp);
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                next
            }
            (Frame::SetProgram(sp), State::MainPending { host,.. }) => {
                let (ack, next) = handle_set_program(host, &sp);
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                next
            }
            (Frame::SetProgram(sp), State::InitPending { init_vm,.. }) => {
                let (ack, next) = handle_set_program(init_vm.into_host(), &sp);
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                next
            }
            (Frame::SetProgram(sp), State::Active { vm }) => {
                let (ack, next) = handle_set_program(vm.into_host(), &sp);
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                next
            }

            (Frame::RunInitOnce, State::MainPending { host, main_kind, timeout_ms, savestate_path }) => {
                // Nothing to run: no init program was set for this round.
                let ack = AckFrame { ok: 1, code: ack_code::SUCCESS };
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                State::MainPending { host, main_kind, timeout_ms, savestate_path }
            }
            (Frame::RunInitOnce, State::InitPending { mut init_vm, main_kind, timeout_ms, savestate_path }) => {
                let result = init_vm.run_init(0, cfg.id, None);
                let code = if result.vm_ok { ack_code::SUCCESS } else { ack_code::INVALID };
                let ack = AckFrame { ok: result.vm_ok as u8, code };
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                State::InitPending { init_vm, main_kind, timeout_ms, savestate_path }
            }

            (Frame::ActivateMain, State::MainPending { host, main_kind, timeout_ms, savestate_path }) => {
                let (ack, next) = activate_main(host, main_kind, timeout_ms, savestate_path);
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                next
            }
            (Frame::ActivateMain, State::InitPending { init_vm, main_kind, timeout_ms, savestate_path }) => {
                let (ack, next) = activate_main(init_vm.into_host(), main_kind, timeout_ms, savestate_path);
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                next
            }

            (Frame::Job(job_frame), State::Active { mut vm }) => {
                if !run_job(cfg, &mut vm, &job_frame, &mut output) {
                    return exit_code::INVALID_HANDLES;
                }
                State::Active { vm }
            }

            // Protocol violations: a job before the worker is active, or a
            // control message in a state that doesn't accept it. Close the
            // pipe rather than guessing at recovery.
            (Frame::Job(job_frame), other) => {
                let result = ResultFrame {
                    job_id: job_frame.job_id,
                    epoch: job_frame.epoch,
                    ok: 0,
                    err: 0,
                    ctx: Vec::new(),
                };
                if write_frame(&mut output, &Frame::Result(result)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                other
            }
            (_, State::Dead) => return exit_code::VM_INIT_FAILED,
            (_, other) => {
                let ack = AckFrame { ok: 0, code: ack_code::INVALID };
                if write_frame(&mut output, &Frame::Ack(ack)).is_err() {
                    return exit_code::INVALID_HANDLES;
                }
                other
            }
        };

        if matches!(state, State::Dead) {
            return exit_code::VM_INIT_FAILED;
        }
    }
}

fn run_job<H: EmulatorHost, W: Write>(
    cfg: &WorkerConfig,
    vm: &mut Vm<H>,
    job_frame: &JobFrame,
    output: &mut W,
) -> bool {
    let job = Job {
        job_id: job_frame.job_id,
        epoch: job_frame.epoch,
        payload: job_frame.payload.clone(),
    };

    let mut send_failed = false;
    let mut sink = |p: VmProgress| {
        let frame = ProgressFrame {
            job_id: job.job_id,
            epoch: job.epoch,
            phase: p.phase,
            cur_frames: p.cur_frames,
            total_frames: p.total_frames,
            elapsed_ms: p.elapsed_ms,
            flags: p.flags,
            poll_ms: 0,
            text: String::new(),
        };
        if write_frame(output, &Frame::Progress(frame)).is_err() {
            send_failed = true;
        }
    };
    let result = vm.run(&job, cfg.id, Some(&mut sink));
    if send_failed {
        return false;
    }

    let frame = ResultFrame {
        job_id: result.job_id,
        epoch: result.epoch,
        ok: result.vm_ok as u8,
        err: result.worker_error,
        ctx: result.ctx,
    };
    write_frame(output, &Frame::Result(frame)).is_ok()
}
