//! BattleTurnRunner payload codec: `{tag=3, version=2, run_ms,
//! vi_stall_ms, initial: InputFrame, n_plans: u32, (for each plan:
//! n_frames: u32, frames[]), n_preds: u32, predicates[]}`.
//!
//! Decoding flattens the per-turn frame lists into a single `Bytes` table
//! plus a parallel per-turn frame-count table, matching how
//! `apply-plan-frame-from` expects to find them in the
//! Context Store.

use crate::{expect_header, take_bytes, take_frame, take_u32, write_header, CodecError, PayloadCodec};
use tas_context::ContextStore;
use tas_registry::keys;
use tas_types::{InputFrame, PredicateRecord, ProgramKind};

#[derive(Debug, Clone, PartialEq)]
pub struct BattleTurnRunnerSpec {
    pub run_ms: u32,
    pub vi_stall_ms: u32,
    pub initial: InputFrame,
    /// One frame list per turn/plan, in turn order.
    pub plans: Vec<Vec<InputFrame>>,
    pub predicates: Vec<PredicateRecord>,
}

pub struct BattleTurnRunnerCodec;

impl PayloadCodec for BattleTurnRunnerCodec {
    type Spec = BattleTurnRunnerSpec;

    const KIND: ProgramKind = ProgramKind::BATTLE_TURN_RUNNER;
    const VERSION: u16 = 2;

    fn encode(spec: &Self::Spec) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, Self::KIND, Self::VERSION);
        out.extend_from_slice(&spec.run_ms.to_le_bytes());
        out.extend_from_slice(&spec.vi_stall_ms.to_le_bytes());
        out.extend_from_slice(&spec.initial.to_wire());

        out.extend_from_slice(&(spec.plans.len() as u32).to_le_bytes());
        for plan in &spec.plans {
            out.extend_from_slice(&(plan.len() as u32).to_le_bytes());
            for frame in plan {
                out.extend_from_slice(&frame.to_wire());
            }
        }

        out.extend_from_slice(&(spec.predicates.len() as u32).to_le_bytes());
        for pred in &spec.predicates {
            out.extend_from_slice(&pred.to_wire());
        }
        out
    }

    fn decode(bytes: &[u8], ctx: &mut ContextStore) -> Result<(), CodecError> {
        let rest = expect_header(bytes, Self::KIND, Self::VERSION)?;
        let (run_ms, off) = take_u32(rest, 0)?;
        let (vi_stall_ms, off) = take_u32(rest, off)?;
        let (initial, off) = take_frame(rest, off)?;
        let (n_plans, mut off) = take_u32(rest, off)?;

        let mut plan_counts = Vec::with_capacity(n_plans as usize * 4);
        let mut plan_table = Vec::new();
        for _ in 0..n_plans {
            let (n_frames, next) = take_u32(rest, off)?;
            off = next;
            plan_counts.extend_from_slice(&n_frames.to_le_bytes());
            for _ in 0..n_frames {
                let (frame, next) = take_frame(rest, off)?;
                off = next;
                plan_table.extend_from_slice(&frame.to_wire());
            }
        }

        let (n_preds, mut off) = take_u32(rest, off)?;
        let mut pred_table = Vec::with_capacity(n_preds as usize * PredicateRecord::WIRE_LEN);
        for _ in 0..n_preds {
            let (raw, next) = take_bytes(rest, off, PredicateRecord::WIRE_LEN)?;
            off = next;
            pred_table.extend_from_slice(raw);
        }
        let pred_baselines = vec![0u8; n_preds as usize * 8];

        ctx.set(keys::battle::INITIAL_FRAME, initial);
        ctx.set(keys::battle::N_PLANS, n_plans);
        ctx.set(keys::battle::PLAN_FRAME_COUNTS, plan_counts);
        ctx.set(keys::battle::PLAN_FRAME_TABLE, plan_table);
        ctx.set(
            keys::battle::LAST_TURN_IDX,
            n_plans.saturating_sub(1),
        );

        ctx.set(keys::battle::PREDICATE_TABLE, pred_table);
        ctx.set(keys::battle::PREDICATE_BASELINES, pred_baselines);

        if run_ms != 0 {
            ctx.set(keys::core::RUN_MS, run_ms);
        }
        if vi_stall_ms != 0 {
            ctx.set(keys::core::VI_STALL_MS, vi_stall_ms);
        }

        ctx.set(keys::battle::PLAN_CURSOR, 0u32);
        ctx.set(keys::core::PLAN_DONE, 0u32);
        ctx.set(keys::core::ACTIVE_TURN, 0u32);
        ctx.set(keys::core::PRED_TOTAL_COUNT, 0u32);
        ctx.set(keys::core::PRED_PASS_COUNT, 0u32);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_types::{Cmp, PredicateFlags, PredicateKind, Width};

    fn sample_predicate() -> PredicateRecord {
        PredicateRecord {
            id: 1,
            required_bp_key: 7,
            kind: PredicateKind::Absolute,
            width: Width::W4,
            cmp: Cmp::Eq,
            flags: PredicateFlags::ACTIVE,
            addr: 0x8000_0000,
            rhs: 7,
        }
    }

    #[test]
    fn round_trips_plans_and_predicates() {
        let spec = BattleTurnRunnerSpec {
            run_ms: 60_000,
            vi_stall_ms: 2000,
            initial: InputFrame::NEUTRAL,
            plans: vec![
                vec![InputFrame::NEUTRAL, InputFrame::NEUTRAL],
                vec![InputFrame::NEUTRAL],
            ],
            predicates: vec![sample_predicate()],
        };
        let bytes = BattleTurnRunnerCodec::encode(&spec);
        let mut ctx = ContextStore::new();
        BattleTurnRunnerCodec::decode(&bytes, &mut ctx).unwrap();

        assert_eq!(ctx.get::<u32>(keys::battle::N_PLANS), Some(2));
        assert_eq!(ctx.get::<u32>(keys::battle::LAST_TURN_IDX), Some(1));
        let counts: Vec<u8> = ctx.get(keys::battle::PLAN_FRAME_COUNTS).unwrap();
        assert_eq!(counts, vec![2, 0, 0, 0, 1, 0, 0, 0]);
        let table: Vec<u8> = ctx.get(keys::battle::PLAN_FRAME_TABLE).unwrap();
        assert_eq!(table.len(), 3 * InputFrame::WIRE_LEN);
        let preds: Vec<u8> = ctx.get(keys::battle::PREDICATE_TABLE).unwrap();
        assert_eq!(preds.len(), PredicateRecord::WIRE_LEN);
        let baselines: Vec<u8> = ctx.get(keys::battle::PREDICATE_BASELINES).unwrap();
        assert_eq!(baselines.len(), 8);
    }

    #[test]
    fn zero_plans_sets_last_turn_idx_to_zero() {
        let spec = BattleTurnRunnerSpec {
            run_ms: 0,
            vi_stall_ms: 0,
            initial: InputFrame::NEUTRAL,
            plans: vec![],
            predicates: vec![],
        };
        let bytes = BattleTurnRunnerCodec::encode(&spec);
        let mut ctx = ContextStore::new();
        BattleTurnRunnerCodec::decode(&bytes, &mut ctx).unwrap();
        assert_eq!(ctx.get::<u32>(keys::battle::LAST_TURN_IDX), Some(0));
    }
}
