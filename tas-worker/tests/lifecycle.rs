//! End-to-end exercise of the worker lifecycle: boot,
//! set-program, run-init-once/activate-main, one job, shutdown on EOF.

use std::io::Cursor;

use tas_codec::seed_probe::{SeedProbeCodec, SeedProbeSpec};
use tas_codec::PayloadCodec;
use tas_emulator::fake::FakeEmulator;
use tas_ipc::{
    ack_code, read_frame, ready_state, write_frame, Frame, JobFrame, SetProgramFrame,
};
use tas_registry::keys;
use tas_types::{InputFrame, ProgramKind};
use tas_worker::config::WorkerConfig;
use tas_worker::{exit_code, lifecycle};

fn cfg(qtbase: &str) -> WorkerConfig {
    WorkerConfig {
        id: 7,
        iso: "/fake/game.iso".to_string(),
        savestate: None,
        qtbase: qtbase.to_string(),
        userdir: "/tmp/tas-worker-test-user".to_string(),
        timeout: 5_000,
    }
}

#[test]
fn full_round_trip_runs_a_seed_probe_job() {
    let platform = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(platform.path().join("Sys")).unwrap();
    let worker_cfg = cfg(platform.path().to_str().unwrap());

    let bp_map = tas_vm::programs::default_breakpoint_map(ProgramKind::SEED_PROBE).unwrap();
    let seed_pc = bp_map.pc(tas_vm::bpkeys::seed_probe::AFTER_RAND_SEED_SET).unwrap();

    let mut host = FakeEmulator::new();
    host.poke_u32(tas_vm::programs::SEED_ADDR, 0xdead_beef);
    host.schedule_hit(seed_pc, 2);

    let mut input = Vec::new();
    write_frame(
        &mut input,
        &Frame::SetProgram(SetProgramFrame {
            init_kind: 0,
            main_kind: ProgramKind::SEED_PROBE.0,
            timeout_ms: 5_000,
            savestate_path: String::new(),
        }),
    )
    .unwrap();
    write_frame(&mut input, &Frame::ActivateMain).unwrap();
    let payload = SeedProbeCodec::encode(&SeedProbeSpec {
        frame: InputFrame::NEUTRAL,
        run_ms: 5_000,
        vi_stall_ms: 0,
    });
    write_frame(
        &mut input,
        &Frame::Job(JobFrame { job_id: 1, epoch: 1, payload }),
    )
    .unwrap();
    // EOF after the job: the worker should shut down cleanly.

    let mut output = Vec::new();
    let code = lifecycle::run(&worker_cfg, host, Cursor::new(input), &mut output);
    assert_eq!(code, exit_code::CLEAN);

    let mut out = Cursor::new(output);

    match read_frame(&mut out).unwrap() {
        Frame::Ready(r) => {
            assert_eq!(r.ok, 1);
            assert_eq!(r.state, ready_state::OK);
        }
        other => panic!("expected ready, got {other:?}"),
    }

    match read_frame(&mut out).unwrap() {
        Frame::Ack(a) => assert_eq!(a.code, ack_code::SUCCESS),
        other => panic!("expected ack for set-program, got {other:?}"),
    }
    match read_frame(&mut out).unwrap() {
        Frame::Ack(a) => assert_eq!(a.code, ack_code::SUCCESS),
        other => panic!("expected ack for activate-main, got {other:?}"),
    }

    match read_frame(&mut out).unwrap() {
        Frame::Result(r) => {
            assert_eq!(r.job_id, 1);
            assert_eq!(r.ok, 1, "seed probe job should hit its breakpoint");
            let ctx = tas_codec::wire::deserialize_context(&r.ctx).unwrap();
            assert_eq!(ctx.get::<u32>(keys::seed_probe::SEED), Some(0xdead_beef));
        }
        other => panic!("expected result, got {other:?}"),
    }
}

#[test]
fn missing_platform_dir_fails_boot() {
    let empty = tempfile::tempdir().unwrap();
    let worker_cfg = cfg(empty.path().to_str().unwrap());
    let host = FakeEmulator::new();
    let mut output = Vec::new();
    let code = lifecycle::run(&worker_cfg, host, Cursor::new(Vec::new()), &mut output);
    assert_eq!(code, exit_code::MISSING_PLATFORM_DIR);

    let mut out = Cursor::new(output);
    match read_frame(&mut out).unwrap() {
        Frame::Ready(r) => {
            assert_eq!(r.ok, 0);
            assert_eq!(r.state, ready_state::MISSING_PLATFORM_DIR);
        }
        other => panic!("expected ready, got {other:?}"),
    }
}

#[test]
fn set_program_with_unknown_kind_is_nacked() {
    let platform = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(platform.path().join("Sys")).unwrap();
    let worker_cfg = cfg(platform.path().to_str().unwrap());
    let host = FakeEmulator::new();

    let mut input = Vec::new();
    write_frame(
        &mut input,
        &Frame::SetProgram(SetProgramFrame {
            init_kind: 0,
            main_kind: 0xfe,
            timeout_ms: 1_000,
            savestate_path: String::new(),
        }),
    )
    .unwrap();

    let mut output = Vec::new();
    let code = lifecycle::run(&worker_cfg, host, Cursor::new(input), &mut output);
    assert_eq!(code, exit_code::CLEAN);

    let mut out = Cursor::new(output);
    let _ready = read_frame(&mut out).unwrap();
    match read_frame(&mut out).unwrap() {
        Frame::Ack(a) => assert_eq!(a.code, ack_code::INVALID),
        other => panic!("expected nack, got {other:?}"),
    }
}
