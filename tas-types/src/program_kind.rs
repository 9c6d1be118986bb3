//! Program-kind registry: the first byte of every payload (§4.3, §6).

/// New program-kinds are added here; decoders must validate their payload
/// version strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKind(pub u8);

impl ProgramKind {
    pub const SEED_PROBE: ProgramKind = ProgramKind(1);
    pub const TAS_MOVIE: ProgramKind = ProgramKind(2);
    pub const BATTLE_TURN_RUNNER: ProgramKind = ProgramKind(3);
    pub const BATTLE_CONTEXT_PROBE: ProgramKind = ProgramKind(4);

    pub fn name(self) -> &'static str {
        match self {
            Self::SEED_PROBE => "seed-probe",
            Self::TAS_MOVIE => "tas-movie",
            Self::BATTLE_TURN_RUNNER => "battle-turn-runner",
            Self::BATTLE_CONTEXT_PROBE => "battle-context-probe",
            _ => "unknown",
        }
    }
}
