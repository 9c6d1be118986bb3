//! Seed-delta exploration: grid-sweeps a handful of input axes and maps
//! each to the signed delta it produces in the emulator's RNG seed, then
//! searches for input triples whose deltas sum to a target delta not yet
//! observed.
//!
//! Both phases are pure consumers of the SeedProbe program-kind (§4.3)
//! through the same job-submission path every other explorer uses; no new
//! wire format or VM op is needed.

use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use tas_codec::seed_probe::{SeedProbeCodec, SeedProbeSpec};
use tas_codec::{wire, PayloadCodec};
use tas_registry::keys;
use tas_runner::{Runner, WorkerSpawner};
use tas_types::{InputFrame, ProgramKind};
use tracing::{debug, info, warn};

use crate::error::ExplorerError;

const GRID_POLL_INTERVAL: Duration = Duration::from_millis(25);
const COMBO_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which input axis a probe grid varies. `Neutral` is the single
/// all-centered baseline frame every other family's delta is measured
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeedFamily {
    Neutral,
    Main,
    CStick,
    Triggers,
}

impl SeedFamily {
    fn title(self) -> &'static str {
        match self {
            SeedFamily::Neutral => "Neutral",
            SeedFamily::Main => "JStick",
            SeedFamily::CStick => "CStick",
            SeedFamily::Triggers => "Triggers",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedProbeEntry {
    pub family: SeedFamily,
    pub x: u8,
    pub y: u8,
    pub seed: u32,
    pub delta: i64,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct SeedProbeGridResult {
    pub base_seed: u32,
    pub entries: Vec<SeedProbeEntry>,
}

#[derive(Debug, Clone)]
pub struct SeedDeltaComboEntry {
    pub frame: InputFrame,
    pub seed: u32,
    pub delta: i64,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct SeedDeltaComboResult {
    pub base_seed: u32,
    pub entries: Vec<SeedDeltaComboEntry>,
}

#[derive(Debug, Clone)]
pub struct RngSeedDeltaArgs {
    pub savestate_path: String,
    pub samples_per_axis: usize,
    pub min_value: u8,
    pub max_value: u8,
    pub cap_trigger_top: bool,
    pub run_timeout_ms: u32,
    pub combos_attempts_per_target: u32,
    pub combos_sampler_tries: u32,
}

impl Default for RngSeedDeltaArgs {
    fn default() -> Self {
        RngSeedDeltaArgs {
            savestate_path: String::new(),
            samples_per_axis: 5,
            min_value: 0,
            max_value: 255,
            cap_trigger_top: true,
            run_timeout_ms: 10_000,
            combos_attempts_per_target: 256,
            combos_sampler_tries: 8,
        }
    }
}

fn linspace_u8(n: usize, min_value: u8, max_value: u8) -> Vec<u8> {
    if n <= 1 {
        return vec![((min_value as u16 + max_value as u16) / 2) as u8];
    }
    let step = (max_value as f32 - min_value as f32) / (n - 1) as f32;
    (0..n).map(|i| (min_value as f32 + i as f32 * step).clamp(0.0, 255.0) as u8).collect()
}

fn build_grid_main(n: usize, min_value: u8, max_value: u8) -> Vec<InputFrame> {
    let xs = linspace_u8(n, min_value, max_value);
    let ys = linspace_u8(n, min_value, max_value);
    let mut out = Vec::with_capacity(n * n);
    for &y in &ys {
        for &x in &xs {
            out.push(InputFrame { main_x: x, main_y: y, ..InputFrame::NEUTRAL });
        }
    }
    out
}

fn build_grid_cstick(n: usize, min_value: u8, max_value: u8) -> Vec<InputFrame> {
    let xs = linspace_u8(n, min_value, max_value);
    let ys = linspace_u8(n, min_value, max_value);
    let mut out = Vec::with_capacity(n * n);
    for &y in &ys {
        for &x in &xs {
            out.push(InputFrame { c_x: x, c_y: y, ..InputFrame::NEUTRAL });
        }
    }
    out
}

/// `cap_top` mirrors the original's top-of-range trigger clamp; at `u8`
/// width the clamp is a no-op (`min(u8::MAX)` never changes a `u8`). Kept
/// only so `RngSeedDeltaArgs` stays shaped like the source it's grounded
/// on.
fn build_grid_trig(n: usize, min_value: u8, max_value: u8, cap_top: bool) -> Vec<InputFrame> {
    let mut ls = linspace_u8(n, min_value, max_value);
    let mut rs = linspace_u8(n, min_value, max_value);
    if cap_top {
        if let Some(last) = ls.last_mut() {
            *last = (*last).min(u8::MAX);
        }
        if let Some(last) = rs.last_mut() {
            *last = (*last).min(u8::MAX);
        }
    }
    let mut out = Vec::with_capacity(n * n);
    for &r in &rs {
        for &l in &ls {
            out.push(InputFrame { trig_l: l, trig_r: r, ..InputFrame::NEUTRAL });
        }
    }
    out
}

fn make_singleton_frame(family: SeedFamily, x: u8, y: u8) -> InputFrame {
    match family {
        SeedFamily::Main => InputFrame { main_x: x, main_y: y, ..InputFrame::NEUTRAL },
        SeedFamily::CStick => InputFrame { c_x: x, c_y: y, ..InputFrame::NEUTRAL },
        SeedFamily::Triggers => InputFrame { trig_l: x, trig_r: y, ..InputFrame::NEUTRAL },
        SeedFamily::Neutral => InputFrame::NEUTRAL,
    }
}

fn signed_delta(a: u32, b: u32) -> i64 {
    (a as i32) as i64 - (b as i32) as i64
}

fn make_label(title: &str, x: u8, y: u8) -> String {
    format!("{title}({x:02X},{y:02X})")
}

fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ceb9fe1a85ec53);
    x ^= x >> 33;
    x
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// A deterministic stride through `0..n`, coprime with `n`, seeded from
/// `seed`. Falls back to `1` (a plain linear scan) when no offset in
/// `seed`'s derived range happens to be coprime with `n`.
fn coprime_stride(n: usize, seed: u64) -> usize {
    if n <= 1 {
        return 1;
    }
    let cand = (seed % (n as u64 - 1)) as usize + 1;
    for k in 0..n {
        let s = (cand + k) % n;
        if s == 0 {
            continue;
        }
        if gcd(s, n) == 1 {
            return s;
        }
    }
    1
}

type Pair = (u8, u8);

/// All `(delta_j, delta_c, delta_t)` triples summing to one target delta,
/// each cycled fairly across its own axis via a coprime stride so a
/// bounded number of attempts samples broadly rather than walking one
/// axis to exhaustion before touching the others.
struct TripleState {
    jd: i64,
    cd: i64,
    td: i64,
    j: Vec<Pair>,
    c: Vec<Pair>,
    t: Vec<Pair>,
    i_j: usize,
    i_c: usize,
    i_t: usize,
    s_j: usize,
    s_c: usize,
    s_t: usize,
    axis: u8,
    emitted: u64,
    total: u64,
}

impl TripleState {
    fn exhausted(&self) -> bool {
        self.emitted >= self.total
    }

    fn advance_axis(&mut self) {
        for _ in 0..3 {
            match self.axis {
                0 => {
                    if self.j.len() > 1 {
                        self.i_j = (self.i_j + self.s_j) % self.j.len();
                        self.axis = 1;
                        return;
                    }
                    self.axis = 1;
                }
                1 => {
                    if self.c.len() > 1 {
                        self.i_c = (self.i_c + self.s_c) % self.c.len();
                        self.axis = 2;
                        return;
                    }
                    self.axis = 2;
                }
                _ => {
                    if self.t.len() > 1 {
                        self.i_t = (self.i_t + self.s_t) % self.t.len();
                        self.axis = 0;
                        return;
                    }
                    self.axis = 0;
                }
            }
        }
    }
}

struct FairComboIterator {
    triples: Vec<TripleState>,
    cur: usize,
}

impl FairComboIterator {
    /// Returns the next untried `(main, cstick, trigger)` pair across all
    /// triples for this target, or `None` once every triple is exhausted
    /// or every candidate has already been tried.
    fn next(&mut self, tried: &mut HashSet<(u8, u8, u8, u8, u8, u8)>, inner_try_cap: u32) -> Option<(Pair, Pair, Pair)> {
        if self.triples.is_empty() {
            return None;
        }
        let n = self.triples.len();
        let mut checked = 0;
        while checked < n {
            let ts = &mut self.triples[self.cur];
            if !ts.exhausted() {
                let mut inner = 0;
                while inner < inner_try_cap && !ts.exhausted() {
                    let jv = ts.j[ts.i_j];
                    let cv = ts.c[ts.i_c];
                    let tv = ts.t[ts.i_t];
                    let key = (jv.0, jv.1, cv.0, cv.1, tv.0, tv.1);

                    ts.advance_axis();
                    ts.emitted += 1;
                    inner += 1;

                    if tried.insert(key) {
                        self.cur = (self.cur + 1) % n;
                        return Some((jv, cv, tv));
                    }
                }
            }
            self.cur = (self.cur + 1) % n;
            checked += 1;
        }
        None
    }
}

struct TargetState {
    target: i64,
    satisfied: bool,
    attempts: u32,
    in_flight: u32,
    iter: FairComboIterator,
}

struct ComboJobMeta {
    target_idx: usize,
    frame: InputFrame,
}

/// Drives the two-phase seed-delta search against a live [`Runner`]: a
/// grid sweep ([`Self::run_grid`]) followed by a fair combo search
/// ([`Self::find_combos`]) over the grid's results. Takes the runner by
/// reference, unlike [`crate::BranchExplorer`], so a caller can run both
/// this and a `BranchExplorer` against the same fleet.
pub struct SeedDeltaExplorer<'r, S: WorkerSpawner> {
    runner: &'r Runner<S>,
}

impl<'r, S: WorkerSpawner + 'static> SeedDeltaExplorer<'r, S> {
    pub fn new(runner: &'r Runner<S>) -> SeedDeltaExplorer<'r, S> {
        SeedDeltaExplorer { runner }
    }

    fn submit_frame(&self, frame: InputFrame, run_ms: u32) -> u64 {
        let payload = SeedProbeCodec::encode(&SeedProbeSpec { frame, run_ms, vi_stall_ms: 0 });
        self.runner.submit(payload)
    }

    /// Sweeps the four seed families (one baseline frame, then a
    /// `samples_per_axis²` grid each over the main stick, c-stick, and
    /// triggers) and returns one entry per sampled frame, sorted by
    /// family then `(y, x)`.
    pub fn run_grid(&self, args: &RngSeedDeltaArgs) -> Result<SeedProbeGridResult, ExplorerError> {
        self.runner.set_program(0, ProgramKind::SEED_PROBE.0, args.run_timeout_ms, Some(args.savestate_path.clone()));
        self.runner.activate_main();

        let batches: [(SeedFamily, Vec<InputFrame>); 4] = [
            (SeedFamily::Neutral, vec![InputFrame::NEUTRAL]),
            (SeedFamily::Main, build_grid_main(args.samples_per_axis, args.min_value, args.max_value)),
            (SeedFamily::CStick, build_grid_cstick(args.samples_per_axis, args.min_value, args.max_value)),
            (SeedFamily::Triggers, build_grid_trig(args.samples_per_axis, args.min_value, args.max_value, args.cap_trigger_top)),
        ];

        let mut out = SeedProbeGridResult::default();

        for (family, inputs) in batches {
            let mut lookup = HashMap::with_capacity(inputs.len());
            for frame in &inputs {
                let job_id = self.submit_frame(*frame, args.run_timeout_ms);
                lookup.insert(job_id, *frame);
            }

            let mut done = 0;
            while done < lookup.len() {
                let Some(result) = self.runner.try_get_result() else {
                    thread::sleep(GRID_POLL_INTERVAL);
                    continue;
                };
                let Some(frame) = lookup.get(&result.job_id).copied() else {
                    // Belongs to some other in-flight job; keep waiting.
                    continue;
                };
                if !result.accepted || !result.vm_ok {
                    return Err(ExplorerError::SeedProbeGridFailed { job_id: result.job_id });
                }
                done += 1;

                let ctx = wire::deserialize_context(&result.ctx)
                    .map_err(|_| ExplorerError::SeedProbeGridFailed { job_id: result.job_id })?;
                let seed = ctx.get::<u32>(keys::seed_probe::SEED).unwrap_or(0);

                if family == SeedFamily::Neutral {
                    out.base_seed = seed;
                }

                let (x, y) = match family {
                    SeedFamily::Main => (frame.main_x, frame.main_y),
                    SeedFamily::CStick => (frame.c_x, frame.c_y),
                    SeedFamily::Triggers => (frame.trig_l, frame.trig_r),
                    SeedFamily::Neutral => (0, 0),
                };

                debug!(job_id = result.job_id, worker_id = result.worker_id, seed, "seed-probe grid result");

                out.entries.push(SeedProbeEntry {
                    family,
                    x,
                    y,
                    seed,
                    delta: signed_delta(seed, out.base_seed),
                    label: make_label(family.title(), x, y),
                });
            }
        }

        out.entries.sort_by(|a, b| a.family.cmp(&b.family).then(a.y.cmp(&b.y)).then(a.x.cmp(&b.x)));
        Ok(out)
    }

    fn enqueue_combo(
        &self,
        state: &mut TargetState,
        args: &RngSeedDeltaArgs,
        tried: &mut HashSet<(u8, u8, u8, u8, u8, u8)>,
        jobs: &mut HashMap<u64, ComboJobMeta>,
        target_idx: usize,
    ) -> bool {
        if state.satisfied || state.attempts >= args.combos_attempts_per_target {
            return false;
        }
        let Some((j, c, t)) = state.iter.next(tried, args.combos_sampler_tries) else {
            return false;
        };
        let frame = InputFrame { main_x: j.0, main_y: j.1, c_x: c.0, c_y: c.1, trig_l: t.0, trig_r: t.1, ..InputFrame::NEUTRAL };
        let job_id = self.submit_frame(frame, args.run_timeout_ms);
        jobs.insert(job_id, ComboJobMeta { target_idx, frame });
        state.attempts += 1;
        state.in_flight += 1;
        true
    }

    /// Buckets `grid`'s per-family deltas, then for every triple-sum not
    /// already present among the grid's own deltas, fair-samples input
    /// triples until the target delta is observed or
    /// `combos_attempts_per_target` is spent. Returns every newly
    /// observed delta (including ones found by accident while chasing a
    /// different target) plus one representative frame per delta already
    /// known from the grid.
    pub fn find_combos(&self, args: &RngSeedDeltaArgs, grid: &SeedProbeGridResult) -> SeedDeltaComboResult {
        self.runner.set_program(0, ProgramKind::SEED_PROBE.0, args.run_timeout_ms, Some(args.savestate_path.clone()));
        self.runner.activate_main();

        let mut out = SeedDeltaComboResult { base_seed: grid.base_seed, entries: Vec::new() };

        let mut singletons: HashSet<i64> = HashSet::from([0]);
        let mut j_map: HashMap<i64, Vec<Pair>> = HashMap::new();
        let mut c_map: HashMap<i64, Vec<Pair>> = HashMap::new();
        let mut t_map: HashMap<i64, Vec<Pair>> = HashMap::new();

        for entry in &grid.entries {
            singletons.insert(entry.delta);
            match entry.family {
                SeedFamily::Main => j_map.entry(entry.delta).or_default().push((entry.x, entry.y)),
                SeedFamily::CStick => c_map.entry(entry.delta).or_default().push((entry.x, entry.y)),
                SeedFamily::Triggers => t_map.entry(entry.delta).or_default().push((entry.x, entry.y)),
                SeedFamily::Neutral => {}
            }
        }

        if j_map.is_empty() || c_map.is_empty() || t_map.is_empty() {
            warn!("seed-delta combo search: missing element deltas, aborting");
            return out;
        }

        let mut have_catalog: HashSet<i64> = HashSet::from([0]);
        for entry in &grid.entries {
            if have_catalog.contains(&entry.delta) {
                continue;
            }
            out.entries.push(SeedDeltaComboEntry {
                frame: make_singleton_frame(entry.family, entry.x, entry.y),
                seed: entry.seed,
                delta: entry.delta,
                label: entry.label.clone(),
            });
            have_catalog.insert(entry.delta);
        }

        let mut j_keys: Vec<i64> = j_map.keys().copied().collect();
        let mut c_keys: Vec<i64> = c_map.keys().copied().collect();
        let mut t_keys: Vec<i64> = t_map.keys().copied().collect();
        j_keys.sort_unstable();
        c_keys.sort_unstable();
        t_keys.sort_unstable();

        let mut targets: Vec<i64> = Vec::new();
        {
            let mut seen = HashSet::new();
            for &jd in &j_keys {
                for &cd in &c_keys {
                    for &td in &t_keys {
                        let s = jd + cd + td;
                        if !singletons.contains(&s) && seen.insert(s) {
                            targets.push(s);
                        }
                    }
                }
            }
        }
        targets.sort_unstable();

        if targets.is_empty() {
            info!("seed-delta combo search: no targets to discover");
            return out;
        }

        let mut tried: HashSet<(u8, u8, u8, u8, u8, u8)> = HashSet::new();
        let mut states: Vec<TargetState> = Vec::with_capacity(targets.len());

        for &target in &targets {
            let mut triples = Vec::new();
            for &jd in &j_keys {
                for &cd in &c_keys {
                    let need = target - jd - cd;
                    let Some(t_vec) = t_map.get(&need) else { continue };
                    let j_vec = &j_map[&jd];
                    let c_vec = &c_map[&cd];

                    let n_j = j_vec.len();
                    let n_c = c_vec.len();
                    let n_t = t_vec.len();
                    let total = (n_j as u64) * (n_c as u64) * (n_t as u64);

                    let seed = mix64(
                        ((target as u32 as u64) << 32)
                            ^ ((jd as u32 as u64) << 21)
                            ^ ((cd as u32 as u64) << 10)
                            ^ (need as u32 as u64),
                    );

                    let i_j = (seed as usize) % n_j;
                    let s_j = coprime_stride(n_j, mix64(seed ^ 0x9E3779B185EBCA87));
                    let i_c = ((seed >> 7) as usize) % n_c;
                    let s_c = coprime_stride(n_c, mix64(seed ^ 0xC2B2AE3D27D4EB4F));
                    let i_t = ((seed >> 13) as usize) % n_t;
                    let s_t = coprime_stride(n_t, mix64(seed ^ 0x165667B19E3779F9));

                    triples.push(TripleState {
                        jd,
                        cd,
                        td: need,
                        j: j_vec.clone(),
                        c: c_vec.clone(),
                        t: t_vec.clone(),
                        i_j,
                        i_c,
                        i_t,
                        s_j,
                        s_c,
                        s_t,
                        axis: ((seed >> 3) % 3) as u8,
                        emitted: 0,
                        total,
                    });
                }
            }
            triples.sort_by(|a, b| a.jd.cmp(&b.jd).then(a.cd.cmp(&b.cd)).then(a.td.cmp(&b.td)));

            states.push(TargetState { target, satisfied: false, attempts: 0, in_flight: 0, iter: FairComboIterator { triples, cur: 0 } });
        }

        let mut jobs: HashMap<u64, ComboJobMeta> = HashMap::new();
        for idx in 0..states.len() {
            self.enqueue_combo(&mut states[idx], args, &mut tried, &mut jobs, idx);
        }

        let worker_count = self.runner.worker_count().max(1) as u32;
        let in_flight_total = |states: &[TargetState]| states.iter().map(|s| s.in_flight).sum::<u32>();
        let all_satisfied = |states: &[TargetState]| states.iter().all(|s| s.satisfied);

        while !all_satisfied(&states) && in_flight_total(&states) > 0 {
            let Some(result) = self.runner.try_get_result() else {
                thread::sleep(COMBO_POLL_INTERVAL);
                continue;
            };
            let Some(meta) = jobs.remove(&result.job_id) else {
                continue;
            };
            states[meta.target_idx].in_flight = states[meta.target_idx].in_flight.saturating_sub(1);

            if !result.accepted || !result.vm_ok {
                warn!(job_id = result.job_id, target = states[meta.target_idx].target, "seed-delta combo job failed");
            } else if let Ok(ctx) = wire::deserialize_context(&result.ctx) {
                let seed = ctx.get::<u32>(keys::seed_probe::SEED).unwrap_or(0);
                let observed = signed_delta(seed, out.base_seed);

                if !have_catalog.contains(&observed) {
                    out.entries.push(SeedDeltaComboEntry { frame: meta.frame, seed, delta: observed, label: format!("obs delta={observed}") });
                    have_catalog.insert(observed);
                    info!(delta = observed, "seed-delta combo catalog add");
                }

                if observed == states[meta.target_idx].target {
                    states[meta.target_idx].satisfied = true;
                    info!(target = states[meta.target_idx].target, "seed-delta combo target satisfied");
                }
            }

            while in_flight_total(&states) < worker_count {
                let mut any = false;
                for idx in 0..states.len() {
                    if self.enqueue_combo(&mut states[idx], args, &mut tried, &mut jobs, idx) {
                        any = true;
                        break;
                    }
                }
                if !any {
                    break;
                }
            }
        }

        for state in &states {
            if !state.satisfied {
                info!(target = state.target, attempts = state.attempts, "seed-delta target not found");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_single_sample_is_midpoint() {
        assert_eq!(linspace_u8(1, 0, 255), vec![127]);
        assert_eq!(linspace_u8(0, 0, 255), vec![127]);
    }

    #[test]
    fn linspace_spans_the_full_range() {
        let v = linspace_u8(5, 0, 255);
        assert_eq!(v.first(), Some(&0));
        assert_eq!(v.last(), Some(&255));
        assert_eq!(v.len(), 5);
    }

    #[test]
    fn main_grid_has_n_squared_frames_with_other_axes_neutral() {
        let grid = build_grid_main(3, 0, 255);
        assert_eq!(grid.len(), 9);
        assert!(grid.iter().all(|f| f.c_x == 128 && f.c_y == 128 && f.trig_l == 0 && f.trig_r == 0));
    }

    #[test]
    fn cap_trigger_top_is_a_documented_no_op_at_u8_width() {
        let capped = build_grid_trig(5, 0, 255, true);
        let uncapped = build_grid_trig(5, 0, 255, false);
        assert_eq!(capped.len(), uncapped.len());
        assert_eq!(capped.last().map(|f| (f.trig_l, f.trig_r)), uncapped.last().map(|f| (f.trig_l, f.trig_r)));
    }

    #[test]
    fn signed_delta_handles_wraparound() {
        assert_eq!(signed_delta(10, 5), 5);
        assert_eq!(signed_delta(5, 10), -5);
        assert_eq!(signed_delta(u32::MAX, 0), -1);
    }

    #[test]
    fn label_formats_as_title_then_hex_pair() {
        assert_eq!(make_label("JStick", 0x0a, 0xff), "JStick(0A,FF)");
    }

    #[test]
    fn mix64_is_deterministic_and_spreads_small_inputs() {
        assert_eq!(mix64(1), mix64(1));
        assert_ne!(mix64(1), mix64(2));
    }

    #[test]
    fn coprime_stride_is_always_coprime_with_n() {
        for n in 2..20 {
            let s = coprime_stride(n, mix64(n as u64));
            assert_eq!(gcd(s, n), 1);
        }
    }

    #[test]
    fn coprime_stride_trivial_for_n_one() {
        assert_eq!(coprime_stride(1, 999), 1);
        assert_eq!(coprime_stride(0, 999), 1);
    }

    #[test]
    fn fair_combo_iterator_exhausts_without_repeating_candidates() {
        let mut triples = Vec::new();
        triples.push(TripleState {
            jd: 0,
            cd: 0,
            td: 0,
            j: vec![(1, 0), (2, 0)],
            c: vec![(3, 0)],
            t: vec![(4, 0), (5, 0)],
            i_j: 0,
            i_c: 0,
            i_t: 0,
            s_j: 1,
            s_c: 1,
            s_t: 1,
            axis: 0,
            emitted: 0,
            total: 4,
        });
        let mut iter = FairComboIterator { triples, cur: 0 };
        let mut tried = HashSet::new();
        let mut seen = HashSet::new();
        let mut count = 0;
        while let Some((j, c, t)) = iter.next(&mut tried, 8) {
            assert!(seen.insert((j, c, t)), "fair iterator yielded a duplicate candidate");
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn make_singleton_frame_sets_only_its_own_axis() {
        let f = make_singleton_frame(SeedFamily::CStick, 7, 9);
        assert_eq!((f.c_x, f.c_y), (7, 9));
        assert_eq!((f.main_x, f.main_y), (128, 128));
    }
}
