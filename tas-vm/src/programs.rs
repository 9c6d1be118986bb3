//! The fixed phase-script program per program-kind`"; the decoder half lives in `tas-codec`,
//! this is the other half).
//!
//! Breakpoint program-counters are game-build-specific and come from the
//! on-disk configuration file, which is out of scope for this crate
//!. [`default_pcs`] supplies the
//! compiled-in defaults used by the `tas-worker` binary and by this
//! crate's own tests; a real deployment overrides them from its config.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tas_registry::{keys, BreakpointEntry, BreakpointMap};
use tas_types::{Cmp, OutcomeCode, ProgramKind};

use crate::bpkeys;
use crate::op::{Op, PhaseScript, TimeoutArg};

/// Memory address of the rand seed this game's battle RNG derives from.
pub const SEED_ADDR: u32 = 0x8034_69A8;

/// Memory address holding the bitmask of presently-alive enemies, read by
/// `BattleContextProbe` for the Branch Explorer's `AnyEnemy` binding.
pub const ENEMY_MASK_ADDR: u32 = 0x8045_1000;

fn seed_probe_program() -> PhaseScript {
    PhaseScript {
        canonical_bp_keys: vec![bpkeys::seed_probe::AFTER_RAND_SEED_SET],
        ops: vec![
            Op::ArmBps,
            Op::ApplyInput { key: keys::seed_probe::FRAME },
            Op::SetTimeout { arg: TimeoutArg::Key(keys::core::RUN_MS) },
            Op::RunUntilBp,
            Op::GotoIf {
                key: keys::core::OUTCOME_CODE,
                cmp: Cmp::Ne,
                literal: OutcomeCode::HIT.0 as u32,
                label: "not_hit",
            },
            Op::ReadU32 { addr: SEED_ADDR, dst: keys::seed_probe::SEED },
            Op::ReturnResult { code: OutcomeCode::HIT },
            Op::Label { name: "not_hit" },
        ],
    }
}

fn tas_movie_program() -> PhaseScript {
    PhaseScript {
        canonical_bp_keys: vec![bpkeys::tas_movie::BEFORE_RAND_SEED_SET],
        ops: vec![
            Op::ArmBps,
            Op::RunUntilBp,
            Op::GotoIf {
                key: keys::core::OUTCOME_CODE,
                cmp: Cmp::Ne,
                literal: OutcomeCode::HIT.0 as u32,
                label: "not_hit",
            },
            Op::ReadU32 { addr: SEED_ADDR, dst: keys::tas_movie::SEED },
            Op::ReturnResult { code: OutcomeCode::HIT },
            Op::Label { name: "not_hit" },
        ],
    }
}

fn battle_context_probe_program() -> PhaseScript {
    PhaseScript {
        canonical_bp_keys: vec![bpkeys::battle_context::CONTEXT_READY],
        ops: vec![
            Op::ArmBps,
            Op::RunUntilBp,
            Op::GotoIf {
                key: keys::core::OUTCOME_CODE,
                cmp: Cmp::Ne,
                literal: OutcomeCode::HIT.0 as u32,
                label: "not_hit",
            },
            Op::ReadU32 { addr: ENEMY_MASK_ADDR, dst: keys::battle::ENEMY_ALIVE_MASK },
            Op::ReturnResult { code: OutcomeCode::HIT },
            Op::Label { name: "not_hit" },
        ],
    }
}

/// The BattleTurnRunner program: applies the initial frame, then for each
/// turn drives the flattened plan's frames one at a time via
/// `apply-plan-frame-from` until the plan is exhausted, runs forward to
/// the next relevant breakpoint, evaluates predicates if that breakpoint
/// is the turn-decision point, and branches on whichever canonical
/// breakpoint actually fired (victory/defeat end the program immediately;
/// turn-inputs advances to the next turn).
fn battle_turn_runner_program() -> PhaseScript {
    PhaseScript {
        canonical_bp_keys: vec![
            bpkeys::battle::TURN_INPUTS,
            bpkeys::battle::VICTORY,
            bpkeys::battle::DEFEAT,
        ],
        ops: vec![
            Op::ArmBps,
            Op::ArmBpsFromPredicateTable,
            Op::CapturePredicateBaselines,
            Op::ApplyInput { key: keys::battle::INITIAL_FRAME },
            Op::SetU32 { key: keys::core::ACTIVE_TURN, value: 0 },
            Op::Label { name: "turn_loop" },
            Op::Label { name: "apply_frame_loop" },
            Op::ApplyPlanFrameFrom { active_turn_key: keys::core::ACTIVE_TURN },
            Op::StepFrames { n: 1 },
            Op::GotoIf {
                key: keys::core::PLAN_DONE,
                cmp: Cmp::Eq,
                literal: 0,
                label: "apply_frame_loop",
            },
            Op::RunUntilBp,
            Op::GotoIf {
                key: keys::core::OUTCOME_CODE,
                cmp: Cmp::Ne,
                literal: OutcomeCode::HIT.0 as u32,
                label: "end",
            },
            Op::EvalPredicatesAtHitBp,
            Op::RecordProgressAtBp,
            Op::GotoIf {
                key: keys::core::HIT_PC,
                cmp: Cmp::Eq,
                literal: bpkeys::battle::VICTORY as u32,
                label: "victory",
            },
            Op::GotoIf {
                key: keys::core::HIT_PC,
                cmp: Cmp::Eq,
                literal: bpkeys::battle::DEFEAT as u32,
                label: "defeat",
            },
            Op::AddU32 { key: keys::core::ACTIVE_TURN, delta: 1 },
            Op::GotoIfKeys {
                lhs: keys::core::ACTIVE_TURN,
                cmp: Cmp::Gt,
                rhs: keys::battle::LAST_TURN_IDX,
                label: "turns_exhausted",
            },
            Op::Goto { label: "turn_loop" },
            Op::Label { name: "turns_exhausted" },
            Op::ReturnResult { code: OutcomeCode::TURNS_EXHAUSTED },
            Op::Label { name: "victory" },
            Op::ReturnResult { code: OutcomeCode::VICTORY },
            Op::Label { name: "defeat" },
            Op::ReturnResult { code: OutcomeCode::DEFEAT },
            Op::Label { name: "end" },
        ],
    }
}

/// Returns the fixed program for `kind`, or `None` for an unrecognized
/// kind.
pub fn phase_script(kind: ProgramKind) -> Option<PhaseScript> {
    Some(match kind {
        ProgramKind::SEED_PROBE => seed_probe_program(),
        ProgramKind::TAS_MOVIE => tas_movie_program(),
        ProgramKind::BATTLE_TURN_RUNNER => battle_turn_runner_program(),
        ProgramKind::BATTLE_CONTEXT_PROBE => battle_context_probe_program(),
        _ => return None,
    })
}

/// `(key, name)` pairs for the canonical breakpoints a given kind arms,
/// independent of the pcs those keys resolve to.
fn breakpoint_names(kind: ProgramKind) -> Option<&'static [(u16, &'static str)]> {
    Some(match kind {
        ProgramKind::SEED_PROBE => &[(bpkeys::seed_probe::AFTER_RAND_SEED_SET, "after_rand_seed_set")],
        ProgramKind::TAS_MOVIE => &[(bpkeys::tas_movie::BEFORE_RAND_SEED_SET, "before_rand_seed_set")],
        ProgramKind::BATTLE_CONTEXT_PROBE => &[(bpkeys::battle_context::CONTEXT_READY, "context_ready")],
        ProgramKind::BATTLE_TURN_RUNNER => &[
            (bpkeys::battle::TURN_INPUTS, "turn_inputs"),
            (bpkeys::battle::VICTORY, "victory"),
            (bpkeys::battle::DEFEAT, "defeat"),
        ],
        _ => return None,
    })
}

/// Compiled-in default pc table, keyed by breakpoint key, standing in for
/// the out-of-scope configuration file. A real deployment supplies its
/// own via [`build_breakpoint_map`].
static DEFAULT_PCS: Lazy<HashMap<u16, u32>> = Lazy::new(|| {
    HashMap::from([
        (bpkeys::seed_probe::AFTER_RAND_SEED_SET, 0x8010_2a40),
        (bpkeys::tas_movie::BEFORE_RAND_SEED_SET, 0x8010_2a10),
        (bpkeys::battle_context::CONTEXT_READY, 0x8020_0010),
        (bpkeys::battle::TURN_INPUTS, 0x8021_0300),
        (bpkeys::battle::VICTORY, 0x8021_0800),
        (bpkeys::battle::DEFEAT, 0x8021_0840),
    ])
});

/// Builds the [`BreakpointMap`] for `kind` from an explicit key->pc table
/// (as loaded from the out-of-scope configuration file). Missing keys
/// fall back to the compiled-in default so the map is always total over
/// the program's own canonical breakpoints.
pub fn build_breakpoint_map(kind: ProgramKind, pcs: &HashMap<u16, u32>) -> Option<BreakpointMap> {
    let names = breakpoint_names(kind)?;
    let entries = names
.iter()
.map(|(key, name)| BreakpointEntry {
            key: *key,
            pc: pcs
.get(key)
.copied()
.or_else(|| DEFAULT_PCS.get(key).copied())
.unwrap_or(0),
            name,
        })
.collect();
    Some(BreakpointMap::new(entries))
}

/// [`build_breakpoint_map`] using only the compiled-in defaults.
pub fn default_breakpoint_map(kind: ProgramKind) -> Option<BreakpointMap> {
    build_breakpoint_map(kind, &HashMap::new())
}

/// Convenience combining [`phase_script`] and [`default_breakpoint_map`]:
/// everything a worker needs to `Vm::init` for `kind` with no external
/// configuration supplied.
pub fn dispatch(kind: ProgramKind) -> Option<(BreakpointMap, PhaseScript)> {
    Some((default_breakpoint_map(kind)?, phase_script(kind)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_kind_has_a_program_and_breakpoint_map() {
        for kind in [
            ProgramKind::SEED_PROBE,
            ProgramKind::TAS_MOVIE,
            ProgramKind::BATTLE_TURN_RUNNER,
            ProgramKind::BATTLE_CONTEXT_PROBE,
        ] {
            let (bp_map, script) = dispatch(kind).expect("known kind must dispatch");
            assert!(!script.ops.is_empty());
            for key in &script.canonical_bp_keys {
                assert!(bp_map.find(*key).is_some());
            }
        }
    }

    #[test]
    fn unknown_kind_dispatches_to_none() {
        assert!(dispatch(ProgramKind(0xfe)).is_none());
    }

    #[test]
    fn battle_turn_runner_labels_all_resolve() {
        let script = battle_turn_runner_program();
        let mut labels = std::collections::HashSet::new();
        for op in &script.ops {
            if let Op::Label { name } = op {
                labels.insert(*name);
            }
        }
        for op in &script.ops {
            let referenced = match op {
                Op::Goto { label } => Some(*label),
                Op::GotoIf { label,.. } => Some(*label),
                Op::GotoIfKeys { label,.. } => Some(*label),
                _ => None,
            };
            if let Some(label) = referenced {
                assert!(labels.contains(label), "dangling label {label}");
            }
        }
    }
}
