//! Predicate Evaluator: operates on the predicate table
//! and baseline buffer stored in the Context Store.

use tas_context::ContextStore;
use tas_emulator::EmulatorHost;
use tas_registry::keys;
use tas_types::{Cmp, PredicateFlags, PredicateKind, PredicateRecord, Width};

use crate::error::VmError;

pub fn decode_table(ctx: &ContextStore) -> Result<Vec<PredicateRecord>, VmError> {
    let raw: Vec<u8> = ctx
        .get(keys::battle::PREDICATE_TABLE)
        .unwrap_or_default();
    if raw.len() % PredicateRecord::WIRE_LEN != 0 {
        return Err(VmError::MalformedPredicateTable("length not a multiple of 24"));
    }
    raw.chunks_exact(PredicateRecord::WIRE_LEN)
        .map(|chunk| {
            let arr: [u8; PredicateRecord::WIRE_LEN] = chunk.try_into().unwrap();
            PredicateRecord::from_wire(&arr)
                .ok_or(VmError::MalformedPredicateTable("bad tag byte in record"))
        })
        .collect()
}

fn baseline_at(baselines: &[u8], idx: usize) -> u64 {
    let off = idx * 8;
    if off + 8 > baselines.len() {
        return 0;
    }
    u64::from_le_bytes(baselines[off..off + 8].try_into().unwrap())
}

fn set_baseline_at(baselines: &mut Vec<u8>, idx: usize, value: u64) {
    let off = idx * 8;
    if baselines.len() < off + 8 {
        baselines.resize(off + 8, 0);
    }
    baselines[off..off + 8].copy_from_slice(&value.to_le_bytes());
}

/// Unions every distinct `required_bp_key` of an active predicate into the
/// arm set, in addition to the program's canonical breakpoints.
pub fn arm_from_table<H: EmulatorHost>(
    ctx: &ContextStore,
    host: &mut H,
    bp_map: &tas_registry::BreakpointMap,
) -> Result<(), VmError> {
    let table = decode_table(ctx)?;
    let mut pcs = Vec::new();
    for pred in &table {
        if pred.is_active() {
            if let Some(pc) = bp_map.pc(pred.required_bp_key) {
                pcs.push(pc);
            }
        }
    }
    pcs.sort_unstable();
    pcs.dedup();
    if !pcs.is_empty() && !host.arm_pc_breakpoints(&pcs) {
        return Err(VmError::ArmFailed);
    }
    Ok(())
}

fn read_width<H: EmulatorHost>(host: &H, addr: u32, width: Width) -> Option<u64> {
    match width {
        Width::W1 => host.read_u8(addr).map(|v| v as u64),
        Width::W2 => host.read_u16(addr).map(|v| v as u64),
        Width::W4 => host.read_u32(addr).map(|v| v as u64),
        Width::W8 => host.read_f64(addr).map(|v| v.to_bits()),
    }
}

/// For each predicate flagged `capture-baseline`, reads `[addr, addr+width)`
/// and stores it at the predicate's baseline slot.
pub fn capture_baselines<H: EmulatorHost>(
    ctx: &mut ContextStore,
    host: &H,
) -> Result<(), VmError> {
    let table = decode_table(ctx)?;
    let mut baselines: Vec<u8> = ctx.get(keys::battle::PREDICATE_BASELINES).unwrap_or_default();
    for (idx, pred) in table.iter().enumerate() {
        if !pred.capture_baseline() {
            continue;
        }
        let value = read_width(host, pred.addr, pred.width).ok_or(VmError::MemoryReadFailed {
            op: "capture-predicate-baselines",
            addr: pred.addr,
        })?;
        set_baseline_at(&mut baselines, idx, value);
    }
    ctx.set(keys::battle::PREDICATE_BASELINES, baselines);
    Ok(())
}

fn lhs_value<H: EmulatorHost>(
    ctx: &ContextStore,
    host: &H,
    pred: &PredicateRecord,
) -> Option<u64> {
    if pred.flags.contains(PredicateFlags::LHS_IS_KEY) {
        ctx.get::<u32>(pred.addr as u16).map(|v| v as u64)
    } else {
        // LHS_IS_PROGRAM has no embedded-program payload in the 24-byte
        // record; fall back to a direct memory read (see DESIGN.md).
        read_width(host, pred.addr, pred.width)
    }
}

fn reference_value(ctx: &ContextStore, pred: &PredicateRecord, baselines: &[u8], idx: usize) -> u64 {
    let rhs = if pred.flags.contains(PredicateFlags::RHS_IS_KEY) {
        ctx.get::<u32>(pred.rhs as u16).map(|v| v as u64).unwrap_or(0)
    } else {
        pred.rhs
    };
    match pred.kind {
        PredicateKind::Absolute => rhs,
        PredicateKind::Delta => baseline_at(baselines, idx).wrapping_add(rhs),
    }
}

/// After a bp hit, evaluates every predicate whose `required_bp_key`
/// matches the hit bp's key. Returns `(pass_count, total_count, first_fail_id)`.
pub fn eval_at_hit_bp<H: EmulatorHost>(
    ctx: &mut ContextStore,
    host: &H,
    hit_bp_key: u16,
) -> Result<(u32, u32, Option<u16>), VmError> {
    let table = decode_table(ctx)?;
    let baselines: Vec<u8> = ctx.get(keys::battle::PREDICATE_BASELINES).unwrap_or_default();

    let mut pass = 0u32;
    let mut total = 0u32;
    let mut first_fail = None;

    for (idx, pred) in table.iter().enumerate() {
        if !pred.is_active() || pred.required_bp_key != hit_bp_key {
            continue;
        }
        total += 1;

        let ok = if pred.width == Width::W8 {
            let lhs = if pred.flags.contains(PredicateFlags::LHS_IS_KEY) {
                ctx.get::<f64>(pred.addr as u16).unwrap_or(0.0)
            } else {
                host.read_f64(pred.addr).ok_or(VmError::MemoryReadFailed {
                    op: "eval-predicates-at-hit-bp",
                    addr: pred.addr,
                })?
            };
            let reference_bits = reference_value(ctx, pred, &baselines, idx);
            pred.cmp.apply_f64(lhs, f64::from_bits(reference_bits))
        } else {
            let lhs = lhs_value(ctx, host, pred).ok_or(VmError::MemoryReadFailed {
                op: "eval-predicates-at-hit-bp",
                addr: pred.addr,
            })?;
            let reference = reference_value(ctx, pred, &baselines, idx);
            pred.cmp.apply_u64(lhs, reference)
        };

        if ok {
            pass += 1;
        } else if first_fail.is_none() {
            first_fail = Some(pred.id);
        }
    }

    ctx.set(keys::core::PRED_PASS_COUNT, pass);
    ctx.set(keys::core::PRED_TOTAL_COUNT, total);
    ctx.set(keys::core::PRED_SUCCESS, if pass == total { 1u32 } else { 0u32 });
    if let Some(id) = first_fail {
        ctx.set(keys::core::PRED_FIRST_FAIL_ID, id as u32);
    }
    Ok((pass, total, first_fail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_emulator::fake::FakeEmulator;

    fn pred(id: u16, bp_key: u16, kind: PredicateKind, cmp: Cmp, addr: u32, rhs: u64, flags: PredicateFlags) -> PredicateRecord {
        PredicateRecord {
            id,
            required_bp_key: bp_key,
            kind,
            width: Width::W4,
            cmp,
            flags: flags | PredicateFlags::ACTIVE,
            addr,
            rhs,
        }
    }

    fn ctx_with_table(table: &[PredicateRecord]) -> ContextStore {
        let mut ctx = ContextStore::new();
        let mut bytes = Vec::new();
        for p in table {
            bytes.extend_from_slice(&p.to_wire());
        }
        ctx.set(keys::battle::PREDICATE_TABLE, bytes);
        ctx
    }

    #[test]
    fn absolute_and_delta_predicates_from_scenario_6() {
        let abs = pred(1, 7, PredicateKind::Absolute, Cmp::Eq, 0x9000_0000, 7, PredicateFlags::empty());
        let delta = pred(
            2,
            7,
            PredicateKind::Delta,
            Cmp::Ge,
            0x9000_0000,
            0,
            PredicateFlags::CAPTURE_BASELINE_AT_TURN_START,
        );
        let mut ctx = ctx_with_table(&[abs, delta]);

        let mut emu = FakeEmulator::new();
        emu.poke_u32(0x9000_0000, 5);
        capture_baselines(&mut ctx, &emu).unwrap();

        emu.poke_u32(0x9000_0000, 7);
        let (pass, total, first_fail) = eval_at_hit_bp(&mut ctx, &emu, 7).unwrap();
        assert_eq!((pass, total), (2, 2));
        assert_eq!(first_fail, None);
    }

    #[test]
    fn delta_predicate_fails_below_baseline() {
        let delta = pred(
            2,
            7,
            PredicateKind::Delta,
            Cmp::Ge,
            0x9000_0000,
            0,
            PredicateFlags::CAPTURE_BASELINE_AT_TURN_START,
        );
        let mut ctx = ctx_with_table(&[delta]);
        let mut emu = FakeEmulator::new();
        emu.poke_u32(0x9000_0000, 5);
        capture_baselines(&mut ctx, &emu).unwrap();

        emu.poke_u32(0x9000_0000, 4);
        let (pass, total, first_fail) = eval_at_hit_bp(&mut ctx, &emu, 7).unwrap();
        assert_eq!((pass, total), (0, 1));
        assert_eq!(first_fail, Some(2));
    }

    #[test]
    fn predicates_for_other_breakpoints_are_skipped() {
        let p = pred(1, 9, PredicateKind::Absolute, Cmp::Eq, 0x9000_0000, 1, PredicateFlags::empty());
        let mut ctx = ctx_with_table(&[p]);
        let emu = FakeEmulator::new();
        let (pass, total, _) = eval_at_hit_bp(&mut ctx, &emu, 7).unwrap();
        assert_eq!((pass, total), (0, 0));
    }
}
