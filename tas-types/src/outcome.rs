//! Outcome codes are opaque identifiers chosen by the running phase
//! script and surfaced to the caller verbatim.

/// A newtype rather than a closed enum: the Battle program family defines
/// its own terminal-state constants beyond the run-until-bp outcomes below,
/// and this crate has no business knowing the full taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutcomeCode(pub u8);

impl OutcomeCode {
    pub const HIT: OutcomeCode = OutcomeCode(0);
    pub const TIMEOUT: OutcomeCode = OutcomeCode(1);
    pub const VI_STALLED: OutcomeCode = OutcomeCode(2);
    pub const MOVIE_ENDED: OutcomeCode = OutcomeCode(3);
    pub const ABORTED: OutcomeCode = OutcomeCode(4);
    pub const UNKNOWN: OutcomeCode = OutcomeCode(5);

    /// Battle-program-defined terminal states; reserved here
    /// only so the constant names exist somewhere a reader can find them.
    pub const VICTORY: OutcomeCode = OutcomeCode(16);
    pub const DEFEAT: OutcomeCode = OutcomeCode(17);
    pub const PLAN_MISMATCH: OutcomeCode = OutcomeCode(18);
    pub const TURNS_EXHAUSTED: OutcomeCode = OutcomeCode(19);

    /// Outcomes that the Branch Explorer treats as recoverable and worth
    /// retrying.
    pub fn is_recoverable_non_hit(self) -> bool {
        matches!(self, Self::TIMEOUT | Self::VI_STALLED | Self::MOVIE_ENDED)
    }
}
