//! End-to-end exercise of the Runner against real worker lifecycles
//!, each
//! worker driven by `tas_worker::lifecycle::run` on its own background
//! thread and connected to the Runner through an in-memory duplex pipe
//! instead of a real OS pipe.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tas_codec::seed_probe::{SeedProbeCodec, SeedProbeSpec};
use tas_codec::PayloadCodec;
use tas_emulator::fake::FakeEmulator;
use tas_registry::keys;
use tas_runner::{Pipes, Runner, WorkerBootParams, WorkerSpawner};
use tas_types::{InputFrame, ProgramKind};
use tas_worker::config::WorkerConfig;
use tas_worker::lifecycle;

/// A blocking byte pipe backed by a shared buffer, standing in for an
/// anonymous OS pipe the way `Cursor` stands in for one in `tas-worker`'s
/// own tests — except this one supports a real blocking reader on a
/// separate thread, which a `Cursor` cannot.
#[derive(Clone)]
struct MemPipe {
    inner: Arc<(Mutex<MemPipeState>, Condvar)>,
}

struct MemPipeState {
    buf: VecDeque<u8>,
    closed: bool,
}

impl MemPipe {
    fn new() -> MemPipe {
        MemPipe { inner: Arc::new((Mutex::new(MemPipeState { buf: VecDeque::new(), closed: false }), Condvar::new())) }
    }
}

impl Read for MemPipe {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        loop {
            if !state.buf.is_empty() {
                let n = state.buf.len().min(out.len());
                for slot in out.iter_mut().take(n) {
                    *slot = state.buf.pop_front().unwrap();
                }
                return Ok(n);
            }
            if state.closed {
                return Ok(0);
            }
            state = cvar.wait(state).unwrap();
        }
    }
}

impl Write for MemPipe {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        state.buf.extend(data.iter().copied());
        cvar.notify_all();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Closes the pipe so a blocked reader sees EOF, mirroring what dropping
/// the write half of a real anonymous pipe does.
struct PipeCloser(MemPipe);
impl Drop for PipeCloser {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.0.inner;
        lock.lock().unwrap().closed = true;
        cvar.notify_all();
    }
}

struct WorkerThreadHandle {
    join: Option<thread::JoinHandle<()>>,
    _closer: PipeCloser,
}

/// Spawns one `tas_worker::lifecycle::run` per worker on a background
/// thread instead of a child process, wired to the Runner through
/// [`MemPipe`] pairs.
struct FakeSpawner {
    platform_dir: String,
}

impl WorkerSpawner for FakeSpawner {
    type Handle = WorkerThreadHandle;

    fn spawn(&self, id: u32, params: &WorkerBootParams) -> Result<(WorkerThreadHandle, Pipes), tas_runner::RunnerError> {
        // runner -> worker
        let to_worker = MemPipe::new();
        // worker -> runner
        let from_worker = MemPipe::new();

        let worker_cfg = WorkerConfig {
            id,
            iso: params.iso.clone(),
            savestate: params.savestate.clone(),
            qtbase: self.platform_dir.clone(),
            userdir: params.userdir.clone(),
            timeout: params.timeout_ms,
        };

        let worker_stdin = to_worker.clone();
        let mut worker_stdout = from_worker.clone();
        let join = thread::Builder::new()
            .name(format!("fake-worker-{id}"))
            .spawn(move || {
                let mut host = FakeEmulator::new();
                host.poke_u32(tas_vm::programs::SEED_ADDR, 0xdead_beef);
                let bp_map = tas_vm::programs::default_breakpoint_map(ProgramKind::SEED_PROBE).unwrap();
                let seed_pc = bp_map.pc(tas_vm::bpkeys::seed_probe::AFTER_RAND_SEED_SET).unwrap();
                host.schedule_hit(seed_pc, 2);
                let _ = lifecycle::run(&worker_cfg, host, worker_stdin, &mut worker_stdout);
            })
            .expect("spawn fake worker thread");

        let handle = WorkerThreadHandle { join: Some(join), _closer: PipeCloser(to_worker.clone()) };
        let pipes = Pipes { stdin: Box::new(to_worker), stdout: Box::new(from_worker) };
        Ok((handle, pipes))
    }

    fn kill(&self, handle: &mut WorkerThreadHandle) {
        if let Some(join) = handle.join.take() {
            let _ = join.join();
        }
    }
}

fn boot_params(userdir: &str) -> WorkerBootParams {
    WorkerBootParams {
        iso: "/fake/game.iso".to_string(),
        savestate: None,
        qtbase: String::new(),
        userdir: userdir.to_string(),
        timeout_ms: 5_000,
    }
}

fn seed_probe_payload() -> Vec<u8> {
    SeedProbeCodec::encode(&SeedProbeSpec { frame: InputFrame::NEUTRAL, run_ms: 5_000, vi_stall_ms: 0 })
}

#[test]
fn stale_epoch_results_are_dropped() {
    let platform = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(platform.path().join("Sys")).unwrap();
    let spawner = FakeSpawner { platform_dir: platform.path().to_str().unwrap().to_string() };

    let runner = Runner::start(spawner, vec![boot_params("/tmp/fleet-test-a")]).unwrap();
    runner.set_program(0, ProgramKind::SEED_PROBE.0, 5_000, None);
    runner.activate_main();

    let job_id = runner.submit(seed_probe_payload());

    // Reconfigure before the result can possibly be collected: the new
    // epoch invalidates every job submitted under the old one.
    runner.set_program(0, ProgramKind::SEED_PROBE.0, 5_000, None);
    runner.activate_main();

    thread::sleep(Duration::from_millis(300));

    let mut saw_job = false;
    for _ in 0..50 {
        if let Some(result) = runner.try_get_result() {
            if result.job_id == job_id {
                saw_job = true;
            }
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(!saw_job, "a result stamped with a superseded epoch must never surface to the caller");

    runner.stop();
}

#[test]
fn a_dead_worker_is_marked_degraded_without_losing_the_fleet() {
    let platform = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(platform.path().join("Sys")).unwrap();
    let spawner = FakeSpawner { platform_dir: platform.path().to_str().unwrap().to_string() };

    let runner = Runner::start(
        spawner,
        vec![boot_params("/tmp/fleet-test-b0"), boot_params("/tmp/fleet-test-b1")],
    )
    .unwrap();
    assert_eq!(runner.worker_count(), 2);

    runner.set_program(0, ProgramKind::SEED_PROBE.0, 5_000, None);
    runner.activate_main();

    let job_id = runner.submit(seed_probe_payload());

    let mut result = None;
    for _ in 0..200 {
        if let Some(r) = runner.try_get_result() {
            result = Some(r);
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    let result = result.expect("one worker should complete the seed-probe job");
    assert_eq!(result.job_id, job_id);
    assert!(result.accepted);
    assert!(result.vm_ok);
    let ctx = tas_codec::wire::deserialize_context(&result.ctx).unwrap();
    assert_eq!(ctx.get::<u32>(keys::seed_probe::SEED), Some(0xdead_beef));

    let status = runner.status();
    assert_eq!(status.worker_count, 2);

    runner.stop();
}
