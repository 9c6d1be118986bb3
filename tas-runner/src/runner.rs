//! The Runner itself. One OS thread per worker
//! owns that worker's pipe pair; the Runner's public methods talk to
//! those threads through a per-worker control channel (reconfiguration)
//! and a shared job queue plus a shared results channel (job traffic).

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, TryRecvError};
use tas_ipc::{
    ack_code, read_frame, write_frame, Frame, IpcError, JobFrame, ResultFrame, SetProgramFrame,
};
use tas_types::{Job, ProgressSnapshot, ResultRecord};

use crate::control::{ControlCommand, ControlReply, ControlRequest};
use crate::error::RunnerError;
use crate::queue::{JobQueue, PopOutcome, QueuedJob};
use crate::transport::{Pipes, WorkerBootParams, WorkerSpawner};

/// Worker ready: 20 s per worker.
const READY_TIMEOUT: Duration = Duration::from_secs(20);
/// Control ack: 5 s per worker.
const ACK_TIMEOUT: Duration = Duration::from_secs(5);
/// How often an idle worker thread comes up for air to check its control
/// channel in between racing for the next queued job.
const DISPATCH_POLL: Duration = Duration::from_millis(50);

struct WorkerIo {
    stdin: Box<dyn Write + Send>,
    /// `None` once the pipe has failed or timed out irrecoverably; the
    /// worker thread treats that as terminal and shuts down.
    stdout: Option<Box<dyn Read + Send>>,
}

/// A snapshot of fleet health`).
#[derive(Debug, Clone)]
pub struct RunnerStatus {
    pub worker_count: usize,
    pub degraded_worker_ids: Vec<u32>,
    pub epoch: u32,
}

pub struct Runner<S: WorkerSpawner> {
    spawner: Arc<S>,
    queue: Arc<JobQueue>,
    results_rx: Receiver<ResultRecord>,
    progress: Vec<Arc<Mutex<Option<ProgressSnapshot>>>>,
    control_txs: Vec<Sender<ControlRequest>>,
    degraded: Vec<Arc<AtomicBool>>,
    handles: Vec<JoinHandle<()>>,
    process_handles: Vec<Mutex<S::Handle>>,
    epoch: Arc<AtomicU32>,
    next_job_id: AtomicU64,
    worker_count: usize,
}

/// Reads one frame with a wall-clock bound by handing the reader off to a
/// throwaway thread. On timeout the reader is abandoned (its blocking
/// read may still be in flight); the caller must treat the worker as
/// unusable from that point, which is the correct response to a hung
/// pipe regardless.
fn read_frame_bounded(
    mut stdout: Box<dyn Read + Send>,
    timeout: Duration,
) -> (Option<Box<dyn Read + Send>>, Result<Frame, IpcError>) {
    let (tx, rx) = crossbeam::channel::bounded(1);
    thread::spawn(move || {
        let result = read_frame(&mut stdout);
        let _ = tx.send((stdout, result));
    });
    match rx.recv_timeout(timeout) {
        Ok((stdout, result)) => (Some(stdout), result),
        Err(_) => (None, Err(IpcError::ShortRead { expected: 0 })),
    }
}

fn boot_one<S: WorkerSpawner>(
    spawner: &S,
    id: u32,
    params: &WorkerBootParams,
) -> Result<(S::Handle, WorkerIo), RunnerError> {
    let (handle, pipes) = spawner.spawn(id, params)?;
    let Pipes { stdin, stdout } = pipes;
    let (stdout, ready_result) = read_frame_bounded(stdout, READY_TIMEOUT);
    let stdout = stdout.ok_or(RunnerError::ReadyTimeout { id })?;
    match ready_result.map_err(|source| RunnerError::BootTransport { id, source })? {
        Frame::Ready(r) if r.ok == 1 => Ok((handle, WorkerIo { stdin, stdout: Some(stdout) })),
        Frame::Ready(r) => Err(RunnerError::BootFailed { id, state: r.state }),
        _ => Err(RunnerError::UnexpectedFrame { id }),
    }
}

/// Writes `frame` then reads back exactly one ack-shaped reply within
/// `ACK_TIMEOUT`, updating `io.stdout` in place. Returns whether the
/// worker is still usable afterwards.
fn handle_control(io: &mut WorkerIo, req: &ControlRequest, degraded: &AtomicBool) -> bool {
    let frame = match &req.command {
        ControlCommand::SetProgram(f) => Frame::SetProgram(f.clone()),
        ControlCommand::RunInitOnce => Frame::RunInitOnce,
        ControlCommand::ActivateMain => Frame::ActivateMain,
    };

    if write_frame(&mut io.stdin, &frame).is_err() {
        degraded.store(true, Ordering::SeqCst);
        let _ = req.reply.send(ControlReply { ok: false });
        return false;
    }

    let Some(stdout) = io.stdout.take() else {
        let _ = req.reply.send(ControlReply { ok: false });
        return false;
    };
    let (stdout, result) = read_frame_bounded(stdout, ACK_TIMEOUT);
    io.stdout = stdout;

    let ok = matches!(result, Ok(Frame::Ack(a)) if a.ok == 1 && a.code == ack_code::SUCCESS);
    if !ok || io.stdout.is_none() {
        degraded.store(true, Ordering::SeqCst);
    }
    let _ = req.reply.send(ControlReply { ok });
    !degraded.load(Ordering::SeqCst)
}

/// Sends one job and reads frames until the matching RESULT arrives,
/// updating the worker's progress cell on every PROGRESS frame along the
/// way. Returns
/// whether the worker is still usable afterwards.
fn run_job(
    io: &mut WorkerIo,
    worker_id: u32,
    job: &Job,
    results_tx: &Sender<ResultRecord>,
    progress: &Mutex<Option<ProgressSnapshot>>,
    degraded: &AtomicBool,
) -> bool {
    let frame = Frame::Job(JobFrame {
        job_id: job.job_id,
        epoch: job.epoch,
        payload: job.payload.clone(),
    });
    if write_frame(&mut io.stdin, &frame).is_err() {
        degraded.store(true, Ordering::SeqCst);
        let _ = results_tx.send(ResultRecord::rejected(job.job_id, job.epoch, worker_id));
        return false;
    }

    loop {
        let Some(mut stdout) = io.stdout.take() else {
            degraded.store(true, Ordering::SeqCst);
            let _ = results_tx.send(ResultRecord::rejected(job.job_id, job.epoch, worker_id));
            return false;
        };
        let read_result = read_frame(&mut stdout);
        io.stdout = Some(stdout);

        match read_result {
            Ok(Frame::Progress(p)) => {
                *progress.lock().unwrap() = Some(ProgressSnapshot {
                    job_id: p.job_id,
                    epoch: p.epoch,
                    phase: p.phase,
                    cur_frames: p.cur_frames,
                    total_frames: p.total_frames,
                    elapsed_ms: p.elapsed_ms,
                    flags: p.flags,
                    text: p.text,
                });
            }
            Ok(Frame::Result(r)) => {
                let record = result_record_from_frame(r, worker_id);
                let _ = results_tx.send(record);
                return true;
            }
            Ok(_) | Err(_) => {
                degraded.store(true, Ordering::SeqCst);
                io.stdout = None;
                let _ = results_tx.send(ResultRecord::rejected(job.job_id, job.epoch, worker_id));
                return false;
            }
        }
    }
}

fn result_record_from_frame(r: ResultFrame, worker_id: u32) -> ResultRecord {
    ResultRecord {
        job_id: r.job_id,
        epoch: r.epoch,
        worker_id,
        accepted: true,
        vm_ok: r.ok == 1,
        worker_error: r.err,
        ctx: r.ctx,
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    mut io: WorkerIo,
    worker_id: u32,
    queue: Arc<JobQueue>,
    control_rx: Receiver<ControlRequest>,
    results_tx: Sender<ResultRecord>,
    progress: Arc<Mutex<Option<ProgressSnapshot>>>,
    degraded: Arc<AtomicBool>,
) {
    'outer: loop {
        loop {
            match control_rx.try_recv() {
                Ok(req) => {
                    if !handle_control(&mut io, &req, &degraded) {
                        break 'outer;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'outer,
            }
        }

        if degraded.load(Ordering::SeqCst) {
            break;
        }

        match queue.pop_timeout(DISPATCH_POLL) {
            PopOutcome::Job(QueuedJob { job }) => {
                if !run_job(&mut io, worker_id, &job, &results_tx, &progress, &degraded) {
                    break;
                }
            }
            PopOutcome::TimedOut => continue,
            PopOutcome::Closed => break,
        }
    }
    // Dropping stdin closes the worker's read end of its pipe, which is
    // what lets an orderly-shutdown worker notice EOF and exit cleanly
    //.
    drop(io.stdin);
}

impl<S: WorkerSpawner + 'static> Runner<S> {
    /// Returns `Result` rather than a bare success flag so the first boot
    /// failure is reported rather than swallowed.
    /// Spawns N workers with identical boot parameters (distinct per-worker
    /// user dirs), waits for all ready acks, and assigns worker ids
    /// 0..N in boot-plan order. Epoch begins at 1.
    pub fn start(spawner: S, boot_params: Vec<WorkerBootParams>) -> Result<Runner<S>, RunnerError> {
        let spawner = Arc::new(spawner);
        let queue = Arc::new(JobQueue::new());
        let (results_tx, results_rx) = crossbeam::channel::unbounded();

        let mut handles = Vec::with_capacity(boot_params.len());
        let mut control_txs = Vec::with_capacity(boot_params.len());
        let mut progress = Vec::with_capacity(boot_params.len());
        let mut degraded = Vec::with_capacity(boot_params.len());
        let mut process_handles = Vec::with_capacity(boot_params.len());

        for (idx, params) in boot_params.iter().enumerate() {
            let id = idx as u32;
            let (handle, io) = boot_one(spawner.as_ref(), id, params)?;

            let (ctrl_tx, ctrl_rx) = crossbeam::channel::unbounded();
            let progress_cell = Arc::new(Mutex::new(None));
            let degraded_flag = Arc::new(AtomicBool::new(false));

            let queue2 = Arc::clone(&queue);
            let results_tx2 = results_tx.clone();
            let progress2 = Arc::clone(&progress_cell);
            let degraded2 = Arc::clone(&degraded_flag);

            let join = thread::Builder::new()
.name(format!("tas-runner-worker-{id}"))
.spawn(move || worker_loop(io, id, queue2, ctrl_rx, results_tx2, progress2, degraded2))
.map_err(|source| RunnerError::Spawn { id, source })?;

            handles.push(join);
            control_txs.push(ctrl_tx);
            progress.push(progress_cell);
            degraded.push(degraded_flag);
            process_handles.push(Mutex::new(handle));
        }

        Ok(Runner {
            spawner,
            queue,
            results_rx,
            progress,
            control_txs,
            degraded,
            handles,
            process_handles,
            epoch: Arc::new(AtomicU32::new(1)),
            next_job_id: AtomicU64::new(1),
            worker_count: boot_params.len(),
        })
    }

    /// Increments the epoch, broadcasts SET_PROGRAM to every non-degraded
    /// worker, and collects acks. A worker that fails to ack is marked
    /// degraded and excluded from further dispatch.
    pub fn set_program(&self, init_kind: u8, main_kind: u8, timeout_ms: u32, savestate_path: Option<String>) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.broadcast(ControlCommand::SetProgram(SetProgramFrame {
            init_kind,
            main_kind,
            timeout_ms,
            savestate_path: savestate_path.unwrap_or_default(),
        }));
    }

    /// Broadcasts RUN_INIT_ONCE and collects acks. Does not touch the
    /// epoch: running an already-loaded init program is not itself a
    /// reconfiguration.
    pub fn run_init_once(&self) {
        self.broadcast(ControlCommand::RunInitOnce);
    }

    /// Increments the epoch, broadcasts ACTIVATE_MAIN, and collects acks.
    pub fn activate_main(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.broadcast(ControlCommand::ActivateMain);
    }

    fn broadcast(&self, command: ControlCommand) {
        let mut pending = Vec::with_capacity(self.control_txs.len());
        for (idx, tx) in self.control_txs.iter().enumerate() {
            if self.degraded[idx].load(Ordering::SeqCst) {
                continue;
            }
            let (reply_tx, reply_rx) = crossbeam::channel::bounded(1);
            let request = ControlRequest { command: command.clone(), reply: reply_tx };
            if tx.send(request).is_err() {
                self.degraded[idx].store(true, Ordering::SeqCst);
                continue;
            }
            pending.push((idx, reply_rx));
        }
        for (idx, reply_rx) in pending {
            match reply_rx.recv_timeout(ACK_TIMEOUT) {
                Ok(reply) if reply.ok => {}
                _ => self.degraded[idx].store(true, Ordering::SeqCst),
            }
        }
    }

    /// Assigns a fresh monotonic job id, stamps the current epoch, and
    /// enqueues `{job_id, epoch, payload}` in the parent-side work queue.
    pub fn submit(&self, payload: Vec<u8>) -> u64 {
        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.queue.push(QueuedJob { job: Job { job_id, epoch, payload } });
        job_id
    }

    /// Non-blocking: pops the next result whose epoch matches the
    /// Runner's current epoch, silently discarding any stale ones found
    /// along the way.
    pub fn try_get_result(&self) -> Option<ResultRecord> {
        let current = self.epoch.load(Ordering::SeqCst);
        loop {
            match self.results_rx.try_recv() {
                Ok(record) if record.epoch == current => return Some(record),
                Ok(_stale) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Non-blocking: takes the most recent progress snapshot for
    /// `worker_id`, if any has arrived since the last call (last-write-wins,
    /// never buffered: progress is a snapshot, not a stream.
    pub fn try_get_progress(&self, worker_id: u32) -> Option<ProgressSnapshot> {
        self.progress.get(worker_id as usize)?.lock().unwrap().take()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn current_epoch(&self) -> u32 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            worker_count: self.worker_count,
            degraded_worker_ids: self
.degraded
.iter()
.enumerate()
.filter(|(_, d)| d.load(Ordering::SeqCst))
.map(|(i, _)| i as u32)
.collect(),
            epoch: self.epoch.load(Ordering::SeqCst),
        }
    }

    /// Closes the work queue, drops the control channels (unblocking any
    /// thread parked on a disconnected control receiver), joins every
    /// worker thread, then kills any process that didn't exit on its own
    /// after its stdin closed.
    pub fn stop(mut self) {
        self.queue.close();
        self.control_txs.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        for handle in &self.process_handles {
            let mut h = handle.lock().unwrap();
            self.spawner.kill(&mut h);
        }
    }
}
