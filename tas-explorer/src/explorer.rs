//! The Branch Explorer itself: compiles a [`UIConfig`]
//! into concrete jobs, submits them to a [`Runner`] with bounded retry,
//! and separates the results into successes and final failures.

use std::thread;
use std::time::Duration;

use tas_codec::battle_context_probe::{BattleContextProbeCodec, BattleContextProbeSpec};
use tas_codec::battle_turn_runner::{BattleTurnRunnerCodec, BattleTurnRunnerSpec};
use tas_codec::{wire, PayloadCodec};
use tas_registry::keys;
use tas_runner::{Runner, WorkerSpawner};
use tas_types::value::BattlePath;
use tas_types::{InputFrame, OutcomeCode, PredicateRecord, ResultRecord};

use crate::error::ExplorerError;
use crate::plan;
use crate::translate::FrameTranslator;
use crate::ui_config::UIConfig;

/// How often the caller-side collection loop wakes up to check for new
/// results.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Bound on how long `gather_context` waits for its probe job
///.
const CONTEXT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ExplorerRun {
    pub successes: Vec<ResultRecord>,
    pub failures: Vec<ResultRecord>,
}

struct PendingJob {
    /// `None` means infinite retries.
    retries_left: Option<u32>,
    payload: Vec<u8>,
}

pub struct BranchExplorer<S: WorkerSpawner> {
    runner: Runner<S>,
    translator: Box<dyn FrameTranslator>,
}

impl<S: WorkerSpawner + 'static> BranchExplorer<S> {
    pub fn new(runner: Runner<S>, translator: Box<dyn FrameTranslator>) -> BranchExplorer<S> {
        BranchExplorer { runner, translator }
    }

    /// Submits a BattleContextProbe job and blocks (with periodic polling)
    /// until its result arrives, returning the live enemy-alive mask it
    /// reports.
    pub fn gather_context(&self) -> Result<u32, ExplorerError> {
        let payload = BattleContextProbeCodec::encode(&BattleContextProbeSpec { run_ms: 0, vi_stall_ms: 0 });
        let job_id = self.runner.submit(payload);

        let mut waited = Duration::ZERO;
        loop {
            if let Some(result) = self.runner.try_get_result() {
                if result.job_id == job_id {
                    if !result.accepted {
                        return Err(ExplorerError::ContextProbeLost);
                    }
                    let ctx = wire::deserialize_context(&result.ctx).map_err(|_| ExplorerError::MissingEnemyMask)?;
                    return ctx.get::<u32>(keys::battle::ENEMY_ALIVE_MASK).ok_or(ExplorerError::MissingEnemyMask);
                }
                // A result for some other in-flight job; keep waiting.
                continue;
            }
            if waited >= CONTEXT_PROBE_TIMEOUT {
                return Err(ExplorerError::ContextProbeLost);
            }
            thread::sleep(POLL_INTERVAL);
            waited += POLL_INTERVAL;
        }
    }

    /// Compiles every turn, joins them into base paths, and expands each
    /// with the fake-attack budget — everything short of crossing with
    /// initial frames.
    pub fn compile_ui(&self, ui: &UIConfig, enemy_alive_mask: u32) -> Vec<BattlePath> {
        plan::compile_ui(ui, enemy_alive_mask)
    }

    /// Full terminal-path enumeration, one `(initial_frame, BattlePath)`
    /// pair per concrete job.
    pub fn enumerate_paths(&self, ui: &UIConfig, enemy_alive_mask: u32) -> Vec<(InputFrame, BattlePath)> {
        plan::enumerate_paths(ui, enemy_alive_mask)
    }

    /// `X` in spec.md §4.8's `estimate_paths_with_fake(ui, X) = X ×
    /// C(B+N, N)`: the path count ignoring both fake-attack expansion and
    /// the initial-frame cross-product.
    pub fn estimate_paths_no_fake(&self, ui: &UIConfig, enemy_alive_mask: u32) -> usize {
        plan::estimate_paths_no_fake(ui, enemy_alive_mask)
    }

    pub fn estimate_paths_with_fake(&self, ui: &UIConfig, x: usize) -> usize {
        plan::estimate_paths_with_fake(ui, x)
    }

    fn build_payload(&self, initial: InputFrame, path: &BattlePath, predicates: &[PredicateRecord]) -> Vec<u8> {
        let plans = path.turns.iter().map(|turn| self.translator.translate_turn(turn)).collect();
        let spec = BattleTurnRunnerSpec { run_ms: 0, vi_stall_ms: 0, initial, plans, predicates: predicates.to_vec() };
        BattleTurnRunnerCodec::encode(&spec)
    }

    fn retry_budget(max_retry_count: i32) -> Option<u32> {
        if max_retry_count < 0 {
            None
        } else {
            Some(max_retry_count as u32)
        }
    }

    fn is_recoverable(result: &ResultRecord) -> bool {
        let Ok(ctx) = wire::deserialize_context(&result.ctx) else {
            return false;
        };
        ctx.get::<u8>(keys::core::OUTCOME_CODE)
.map(OutcomeCode)
.is_some_and(OutcomeCode::is_recoverable_non_hit)
    }

    fn is_victory(result: &ResultRecord) -> bool {
        let Ok(ctx) = wire::deserialize_context(&result.ctx) else {
            return false;
        };
        ctx.get::<u8>(keys::core::OUTCOME_CODE) == Some(OutcomeCode::VICTORY.0)
    }

    /// Gathers context, compiles and enumerates `ui`, submits every job,
    /// and resubmits on recoverable non-hit outcomes up to
    /// `ui.max_retry_count` times each.
    pub fn run(&self, ui: &UIConfig) -> Result<ExplorerRun, ExplorerError> {
        let enemy_alive_mask = self.gather_context()?;
        let jobs = self.enumerate_paths(ui, enemy_alive_mask);

        let mut pending = std::collections::HashMap::new();
        for (frame, path) in &jobs {
            let payload = self.build_payload(*frame, path, &ui.predicates);
            let job_id = self.runner.submit(payload.clone());
            pending.insert(job_id, PendingJob { retries_left: Self::retry_budget(ui.max_retry_count), payload });
        }

        let mut successes = Vec::new();
        let mut failures = Vec::new();

        while !pending.is_empty() {
            let Some(result) = self.runner.try_get_result() else {
                thread::sleep(POLL_INTERVAL);
                continue;
            };
            let Some(state) = pending.remove(&result.job_id) else {
                // Belongs to a superseded submission or another caller; ignore.
                continue;
            };

            let transport_failure = !result.accepted;
            let recoverable_non_hit = result.accepted && !result.vm_ok && Self::is_recoverable(&result);

            if transport_failure || recoverable_non_hit {
                match state.retries_left {
                    Some(0) => failures.push(result),
                    Some(n) => {
                        let new_id = self.runner.submit(state.payload.clone());
                        pending.insert(new_id, PendingJob { retries_left: Some(n - 1), payload: state.payload });
                    }
                    None => {
                        let new_id = self.runner.submit(state.payload.clone());
                        pending.insert(new_id, PendingJob { retries_left: None, payload: state.payload });
                    }
                }
            } else if Self::is_victory(&result) {
                successes.push(result);
            } else {
                failures.push(result);
            }
        }

        Ok(ExplorerRun { successes, failures })
    }
}
