//! The adaptive poll-interval schedule used by `run-until-bp`: the interval tightens as the deadline approaches, and is
//! additionally clamped to half of `vi_stall_ms` while that guard is
//! active so a stall is never missed by more than half its own window.

/// Picks the poll interval for a `run-until-bp` loop given how much time
/// remains before timeout. Monotonic tiers: ≥5 min → 500ms, ≥1 min →
/// 250ms, ≥10s → 100ms, ≥2s → 50ms, otherwise 20ms.
pub fn tier_for_remaining(remaining_ms: u32) -> u32 {
    const FIVE_MIN: u32 = 5 * 60_000;
    const ONE_MIN: u32 = 60_000;
    const TEN_SEC: u32 = 10_000;
    const TWO_SEC: u32 = 2_000;

    if remaining_ms >= FIVE_MIN {
        500
    } else if remaining_ms >= ONE_MIN {
        250
    } else if remaining_ms >= TEN_SEC {
        100
    } else if remaining_ms >= TWO_SEC {
        50
    } else {
        20
    }
}

/// Applies the vi-stall clamp on top of the base tier. `vi_stall_ms == 0`
/// means the guard is disabled.
pub fn poll_interval_ms(remaining_ms: u32, vi_stall_ms: u32) -> u32 {
    let base = tier_for_remaining(remaining_ms);
    if vi_stall_ms > 0 {
        base.min((vi_stall_ms / 2).max(1))
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_monotonic_with_time_remaining() {
        assert_eq!(tier_for_remaining(10 * 60_000), 500);
        assert_eq!(tier_for_remaining(2 * 60_000), 250);
        assert_eq!(tier_for_remaining(30_000), 100);
        assert_eq!(tier_for_remaining(5_000), 50);
        assert_eq!(tier_for_remaining(500), 20);
    }

    #[test]
    fn vi_stall_clamps_to_half() {
        assert_eq!(poll_interval_ms(10 * 60_000, 600), 300);
        assert_eq!(poll_interval_ms(500, 600), 20);
        assert_eq!(poll_interval_ms(500, 1), 1);
    }
}
