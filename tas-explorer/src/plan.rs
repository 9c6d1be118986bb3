//! Pure compilation/enumeration functions, split out from
//! [`crate::explorer`] so they can run without a live fleet — enumeration
//! only needs the live enemy-alive mask, not a `Runner`.

use tas_types::value::BattlePath;
use tas_types::InputFrame;

use crate::cartesian::{binomial, cross_with_initial_frames, expand_fake_attacks, join_turns};
use crate::compile::compile_turn;
use crate::ui_config::UIConfig;

/// Compiles every turn, joins them into base paths, and expands each with
/// the fake-attack budget — everything short of crossing with initial
/// frames.
pub fn compile_ui(ui: &UIConfig, enemy_alive_mask: u32) -> Vec<BattlePath> {
    let per_turn_rows: Vec<Vec<Vec<u8>>> = ui.turns.iter().map(|turn| compile_turn(turn, enemy_alive_mask)).collect();
    let base_paths = join_turns(&per_turn_rows);
    expand_fake_attacks(&base_paths, ui.fake_attack_budget)
}

/// Full terminal-path enumeration, one `(initial_frame, BattlePath)` pair
/// per concrete job.
pub fn enumerate_paths(ui: &UIConfig, enemy_alive_mask: u32) -> Vec<(InputFrame, BattlePath)> {
    let paths = compile_ui(ui, enemy_alive_mask);
    cross_with_initial_frames(&paths, &ui.initial_frames)
}

/// `X` in spec.md §4.8's `estimate_paths_with_fake(ui, X) = X × C(B+N,
/// N)`: the path count ignoring both fake-attack expansion and the
/// initial-frame cross-product.
pub fn estimate_paths_no_fake(ui: &UIConfig, enemy_alive_mask: u32) -> usize {
    ui.turns.iter().map(|turn| compile_turn(turn, enemy_alive_mask).len()).product()
}

pub fn estimate_paths_with_fake(ui: &UIConfig, x: usize) -> usize {
    let n = ui.turns.len() as u64;
    x * binomial(ui.fake_attack_budget as u64 + n, n) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui_config::{TargetBinding, UIAction};
    use tas_types::InputFrame;

    #[test]
    fn two_turn_attack_plan_any_enemy_targeting_yields_three_paths() {
        let ui = UIConfig {
            turns: vec![
                vec![UIAction { actor: 0, target: TargetBinding::AnyEnemy }],
                vec![UIAction { actor: 0, target: TargetBinding::SameAsOtherPC(0) }],
            ],
            fake_attack_budget: 0,
            predicates: vec![],
            initial_frames: vec![InputFrame::NEUTRAL],
            max_retry_count: 0,
        };
        // 3 present enemies -> alive mask with exactly 3 set bits.
        let enemy_alive_mask = 0b0000_1011;
        let paths = compile_ui(&ui, enemy_alive_mask);
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert_eq!(path.turns[0].targets, path.turns[1].targets);
        }
    }

    #[test]
    fn fake_attack_budget_two_two_turns_yields_eighteen_paths() {
        let ui = UIConfig {
            turns: vec![
                vec![UIAction { actor: 0, target: TargetBinding::AnyEnemy }],
                vec![UIAction { actor: 0, target: TargetBinding::SameAsOtherPC(0) }],
            ],
            fake_attack_budget: 2,
            predicates: vec![],
            initial_frames: vec![InputFrame::NEUTRAL],
            max_retry_count: 0,
        };
        let enemy_alive_mask = 0b0000_1011;
        let paths = compile_ui(&ui, enemy_alive_mask);
        assert_eq!(paths.len(), 18);
        for path in &paths {
            let total: u32 = path.turns.iter().map(|t| t.fake_attack_count).sum();
            assert!(total <= 2);
        }
    }

    #[test]
    fn zero_turns_zero_budget_is_one_empty_path() {
        let ui = UIConfig {
            turns: vec![],
            fake_attack_budget: 0,
            predicates: vec![],
            initial_frames: vec![InputFrame::NEUTRAL],
            max_retry_count: 0,
        };
        let paths = compile_ui(&ui, 0);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].turns.is_empty());
    }

    #[test]
    fn no_initial_frames_yields_zero_jobs() {
        let ui = UIConfig {
            turns: vec![],
            fake_attack_budget: 0,
            predicates: vec![],
            initial_frames: vec![],
            max_retry_count: 0,
        };
        assert!(enumerate_paths(&ui, 0).is_empty());
    }

    #[test]
    fn empty_domain_in_any_turn_yields_zero_paths() {
        let ui = UIConfig {
            turns: vec![
                vec![UIAction { actor: 0, target: TargetBinding::AnyEnemy }],
                vec![UIAction { actor: 0, target: TargetBinding::SingleEnemy(0) }],
            ],
            fake_attack_budget: 0,
            predicates: vec![],
            initial_frames: vec![InputFrame::NEUTRAL],
            max_retry_count: 0,
        };
        assert!(compile_ui(&ui, 0b1).is_empty());
    }

    #[test]
    fn estimate_with_fake_matches_direct_enumeration() {
        let ui = UIConfig {
            turns: vec![
                vec![UIAction { actor: 0, target: TargetBinding::AnyEnemy }],
                vec![UIAction { actor: 0, target: TargetBinding::SameAsOtherPC(0) }],
            ],
            fake_attack_budget: 2,
            predicates: vec![],
            initial_frames: vec![InputFrame::NEUTRAL],
            max_retry_count: 0,
        };
        let enemy_alive_mask = 0b0000_1011;
        let x = estimate_paths_no_fake(&ui, enemy_alive_mask);
        assert_eq!(x, 3);
        assert_eq!(estimate_paths_with_fake(&ui, x), 18);
    }
}
