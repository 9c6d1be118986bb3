//! Symbolic plan input: what the caller hands the explorer
//! before anything concrete has been compiled.

use tas_types::{InputFrame, PredicateRecord};

/// One actor's target binding within a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetBinding {
    /// Exactly one enemy: the single set bit in `mask` names its slot.
    SingleEnemy(u32),
    /// One of the enemies named by the set bits in `mask`.
    MultipleEnemies(u32),
    /// One of every enemy presently alive, per the live context probe.
    AnyEnemy,
    /// Whatever actor `0`-indexed `actor_id` targets this same turn.
    SameAsOtherPC(usize),
}

/// One actor slot's action within a turn. Only the target binding varies;
/// everything else about "attack" is fixed for this exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UIAction {
    pub actor: usize,
    pub target: TargetBinding,
}

/// One actor slot per entry, in actor order.
pub type UITurn = Vec<UIAction>;

/// The full symbolic configuration a caller hands to the explorer.
#[derive(Debug, Clone)]
pub struct UIConfig {
    pub turns: Vec<UITurn>,
    pub fake_attack_budget: u32,
    pub predicates: Vec<PredicateRecord>,
    pub initial_frames: Vec<InputFrame>,
    /// `-1` means infinite retries.
    pub max_retry_count: i32,
}
