//! Joining compiled turns into terminal battle paths.

use itertools::Itertools;
use tas_types::value::{BattlePath, TurnPlan};
use tas_types::InputFrame;

use crate::compile::CARRY_FORWARD;

/// `C(n, k)`, computed iteratively with a `u128` accumulator so the
/// moderate values the explorer deals with (tens of turns, small budgets)
/// never overflow before the final cast back to `usize`.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * (n - i) as u128 / (i + 1) as u128;
    }
    result as u64
}

/// Every non-negative integer `n`-tuple summing to at most `budget`
/// (stars-and-bars with a cap). `n == 0` yields a single empty tuple
/// regardless of `budget` path").
pub fn fake_attack_vectors(n: usize, budget: u32) -> Vec<Vec<u32>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for head in 0..=budget {
        for mut tail in fake_attack_vectors(n - 1, budget - head) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

/// Joins compiled per-turn target rows (from [`crate::compile::compile_turn`])
/// into base battle paths, resolving any `CARRY_FORWARD` placeholder
/// against the previous turn's value for that actor.
///
/// Zero turns yields exactly one (empty) base path; any turn with an empty compiled row list yields
/// zero base paths for the whole config.
pub fn join_turns(per_turn_rows: &[Vec<Vec<u8>>]) -> Vec<Vec<Vec<u8>>> {
    if per_turn_rows.is_empty() {
        return vec![Vec::new()];
    }
    if per_turn_rows.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    per_turn_rows
.iter()
.cloned()
.multi_cartesian_product()
.map(|mut combo| {
            for t in 1..combo.len() {
                let prev = combo[t - 1].clone();
                let cur = &mut combo[t];
                for (actor, value) in cur.iter_mut().enumerate() {
                    if *value == CARRY_FORWARD {
                        *value = prev.get(actor).copied().unwrap_or(0);
                    }
                }
            }
            combo
        })
.collect()
}

/// Expands each base path (a `Vec` of per-turn target rows) with every
/// admissible fake-attack vector, producing one [`BattlePath`] per
/// (base path, f-vector) pair.
pub fn expand_fake_attacks(base_paths: &[Vec<Vec<u8>>], budget: u32) -> Vec<BattlePath> {
    let n = base_paths.first().map_or(0, Vec::len);
    let f_vectors = fake_attack_vectors(n, budget);

    let mut out = Vec::with_capacity(base_paths.len() * f_vectors.len());
    for base in base_paths {
        for f_vector in &f_vectors {
            let turns = base
.iter()
.zip(f_vector.iter())
.map(|(targets, &fake_attack_count)| TurnPlan { targets: targets.clone(), fake_attack_count })
.collect();
            out.push(BattlePath { turns });
        }
    }
    out
}

/// Crosses every terminal path with every initial frame. An empty
/// `initial_frames` list yields zero jobs.
pub fn cross_with_initial_frames(paths: &[BattlePath], initial_frames: &[InputFrame]) -> Vec<(InputFrame, BattlePath)> {
    let mut out = Vec::with_capacity(paths.len() * initial_frames.len());
    for path in paths {
        for &frame in initial_frames {
            out.push((frame, path.clone()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_matches_known_values() {
        assert_eq!(binomial(4, 2), 6);
        assert_eq!(binomial(0, 0), 1);
        assert_eq!(binomial(5, 0), 1);
    }

    #[test]
    fn fake_attack_budget_two_two_turns_has_six_vectors() {
        let vectors = fake_attack_vectors(2, 2);
        assert_eq!(vectors.len(), 6);
        for v in &vectors {
            assert!(v.iter().sum::<u32>() <= 2);
        }
    }

    #[test]
    fn zero_turns_zero_budget_is_one_empty_vector() {
        assert_eq!(fake_attack_vectors(0, 0), vec![Vec::new()]);
    }

    #[test]
    fn join_turns_with_no_turns_is_one_empty_path() {
        assert_eq!(join_turns(&[]), vec![Vec::new()]);
    }

    #[test]
    fn join_turns_propagates_empty_domain() {
        let rows = vec![vec![vec![0u8]], Vec::new()];
        assert!(join_turns(&rows).is_empty());
    }

    #[test]
    fn join_turns_resolves_carry_forward_from_previous_turn() {
        let turn1 = vec![vec![0u8], vec![1u8], vec![3u8]];
        let turn2 = vec![vec![CARRY_FORWARD]];
        let joined = join_turns(&[turn1, turn2]);
        assert_eq!(joined, vec![vec![vec![0], vec![0]], vec![vec![1], vec![1]], vec![vec![3], vec![3]]]);
    }

    #[test]
    fn initial_frames_empty_yields_zero_jobs() {
        let path = BattlePath { turns: vec![] };
        assert!(cross_with_initial_frames(&[path], &[]).is_empty());
    }
}
