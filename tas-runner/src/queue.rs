//! The single work queue feeding all workers:
//! "idle workers race to acquire the queue mutex, pop one job, send it,
//! wait for its RESULT, release the slot". A short-held `Mutex` plus a
//! `Condvar` so no worker thread blocks the others while idle.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tas_types::Job;

#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job: Job,
}

/// Outcome of [`JobQueue::pop_timeout`].
#[derive(Debug)]
pub enum PopOutcome {
    Job(QueuedJob),
    TimedOut,
    Closed,
}

struct State {
    jobs: VecDeque<QueuedJob>,
    closed: bool,
}

pub struct JobQueue {
    state: Mutex<State>,
    not_empty: Condvar,
}

impl JobQueue {
    pub fn new() -> JobQueue {
        JobQueue {
            state: Mutex::new(State { jobs: VecDeque::new(), closed: false }),
            not_empty: Condvar::new(),
        }
    }

    pub fn push(&self, job: QueuedJob) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.jobs.push_back(job);
        self.not_empty.notify_one();
    }

    /// Blocks until a job is available or the queue is closed, in which
    /// case it returns `None` and the caller's dispatch loop should exit
    ///.
    pub fn pop_blocking(&self) -> Option<QueuedJob> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Used by a worker thread's dispatch loop so it can periodically come
    /// up for air and check its control channel.
    pub fn pop_timeout(&self, timeout: Duration) -> PopOutcome {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return PopOutcome::Job(job);
            }
            if state.closed {
                return PopOutcome::Closed;
            }
            let (next, wait_result) = self.not_empty.wait_timeout(state, timeout).unwrap();
            state = next;
            if let Some(job) = state.jobs.pop_front() {
                return PopOutcome::Job(job);
            }
            if state.closed {
                return PopOutcome::Closed;
            }
            if wait_result.timed_out() {
                return PopOutcome::TimedOut;
            }
        }
    }

    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }
}

impl Default for JobQueue {
    fn default() -> JobQueue {
        JobQueue::new()
    }
}
