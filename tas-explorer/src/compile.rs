//! Per-turn compilation: backtracking over
//! target-binding domains, with `SameAs` actors resolved after the actor
//! they mirror and a turn-wide cycle producing an empty turn rather than
//! a partial one.

use std::collections::VecDeque;

use crate::ui_config::{TargetBinding, UITurn};

/// Placeholder written into an actor's slot when its binding is
/// `SameAsOtherPC(self)` — "whatever this actor targeted last turn", which
/// no actor in the *current* turn can resolve. [`crate::cartesian`] fills
/// it in from the previous turn's assembled path once turns are joined.
pub const CARRY_FORWARD: u8 = 0xff;

/// Bit indices of every set bit in `mask`, ascending, as domain values.
fn bits(mask: u32) -> Vec<u8> {
    (0..32u8).filter(|b| mask & (1 << b) != 0).collect()
}

/// Returns `None` on a `SameAs` dependency cycle"), else
/// actor indices in an order where every `SameAs` actor follows its
/// target. Self-referential bindings (`SameAsOtherPC(self)`, spec.md §8
/// scenario 2's "mirror last turn") are excluded from the graph entirely:
/// they carry no intra-turn dependency and are resolved after joining
/// turns instead.
fn topo_order(turn: &UITurn) -> Option<Vec<usize>> {
    let n = turn.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for action in turn {
        if let TargetBinding::SameAsOtherPC(target) = action.target {
            if target == action.actor {
                continue;
            }
            if target >= n {
                // A binding to a nonexistent actor can never resolve;
                // treat it the same as a cycle: empty turn.
                return None;
            }
            dependents[target].push(action.actor);
            indegree[action.actor] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &dep in &dependents[i] {
            indegree[dep] -= 1;
            if indegree[dep] == 0 {
                queue.push_back(dep);
            }
        }
    }

    if order.len() == n {
        Some(order)
    } else {
        None
    }
}

/// Domain of concrete target values for one non-`SameAs` action.
fn domain(action_target: &TargetBinding, enemy_alive_mask: u32) -> Vec<u8> {
    match action_target {
        TargetBinding::SingleEnemy(mask) => bits(*mask),
        TargetBinding::MultipleEnemies(mask) => bits(*mask),
        TargetBinding::AnyEnemy => bits(enemy_alive_mask),
        TargetBinding::SameAsOtherPC(_) => Vec::new(),
    }
}

/// Compiles one turn into every concrete `targets` vector it admits, in
/// actor order. Returns an empty list if the turn has no admissible
/// assignment at all (dependency cycle, or any non-`SameAs` actor with an
/// empty domain — spec.md §4.8 step 5).
pub fn compile_turn(turn: &UITurn, enemy_alive_mask: u32) -> Vec<Vec<u8>> {
    if turn.is_empty() {
        return vec![Vec::new()];
    }

    let Some(order) = topo_order(turn) else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<u8>> = vec![vec![0u8; turn.len()]];
    for &actor in &order {
        let action = &turn[actor];
        match &action.target {
            TargetBinding::SameAsOtherPC(target) if *target == actor => {
                for row in rows.iter_mut() {
                    row[actor] = CARRY_FORWARD;
                }
            }
            TargetBinding::SameAsOtherPC(target) => {
                for row in rows.iter_mut() {
                    row[actor] = row[*target];
                }
            }
            other => {
                let values = domain(other, enemy_alive_mask);
                if values.is_empty() {
                    return Vec::new();
                }
                let mut next = Vec::with_capacity(rows.len() * values.len());
                for row in &rows {
                    for &v in &values {
                        let mut candidate = row.clone();
                        candidate[actor] = v;
                        next.push(candidate);
                    }
                }
                rows = next;
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui_config::UIAction;

    #[test]
    fn single_enemy_has_one_domain_value() {
        let turn = vec![UIAction { actor: 0, target: TargetBinding::SingleEnemy(1 << 3) }];
        assert_eq!(compile_turn(&turn, 0), vec![vec![3]]);
    }

    #[test]
    fn any_enemy_enumerates_alive_mask() {
        let turn = vec![UIAction { actor: 0, target: TargetBinding::AnyEnemy }];
        let rows = compile_turn(&turn, 0b1011);
        assert_eq!(rows, vec![vec![0], vec![1], vec![3]]);
    }

    #[test]
    fn same_as_mirrors_the_resolved_target() {
        let turn = vec![
            UIAction { actor: 0, target: TargetBinding::AnyEnemy },
            UIAction { actor: 1, target: TargetBinding::SameAsOtherPC(0) },
        ];
        let rows = compile_turn(&turn, 0b0101);
        assert_eq!(rows, vec![vec![0, 0], vec![2, 2]]);
    }

    #[test]
    fn cycle_yields_empty_turn() {
        let turn = vec![
            UIAction { actor: 0, target: TargetBinding::SameAsOtherPC(1) },
            UIAction { actor: 1, target: TargetBinding::SameAsOtherPC(0) },
        ];
        assert!(compile_turn(&turn, 0xffff_ffff).is_empty());
    }

    #[test]
    fn empty_domain_propagates_to_empty_turn() {
        let turn = vec![UIAction { actor: 0, target: TargetBinding::AnyEnemy }];
        assert!(compile_turn(&turn, 0).is_empty());
    }

    #[test]
    fn empty_turn_yields_one_empty_row() {
        let turn: UITurn = Vec::new();
        assert_eq!(compile_turn(&turn, 0), vec![Vec::new()]);
    }

    #[test]
    fn self_referential_same_as_yields_one_carry_row() {
        let turn = vec![UIAction { actor: 0, target: TargetBinding::SameAsOtherPC(0) }];
        assert_eq!(compile_turn(&turn, 0b0101), vec![vec![CARRY_FORWARD]]);
    }
}
