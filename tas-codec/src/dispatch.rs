//! The decode-side dispatch table, keyed by the program-kind tag
//!. Dispatching an unknown kind fails the job.

use crate::{battle_context_probe, battle_turn_runner, seed_probe, tas_movie, PayloadCodec};
use tas_context::ContextStore;
use tas_types::ProgramKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload truncated")]
    Truncated,
    #[error("wrong program-kind tag: got {got:?}, expected {want:?}")]
    WrongKind { got: ProgramKind, want: ProgramKind },
    #[error("payload version mismatch: got {got}, expected {want}")]
    VersionMismatch { got: u16, want: u16 },
    #[error("unknown program-kind tag {0}")]
    UnknownKind(u8),
    #[error("malformed payload field: {0}")]
    Malformed(&'static str),
}

/// Decodes `payload` into `ctx` using whichever codec matches its first
/// byte. This is the parent-agnostic half of the program-kind dispatch
/// table; the other half (mapping a kind to its fixed `PhaseScript`) lives
/// in `tas-vm`, which already depends on this crate.
pub fn decode_by_tag(payload: &[u8], ctx: &mut ContextStore) -> Result<(), CodecError> {
    let tag = *payload.first().ok_or(CodecError::Truncated)?;
    match ProgramKind(tag) {
        ProgramKind::SEED_PROBE => seed_probe::SeedProbeCodec::decode(payload, ctx),
        ProgramKind::TAS_MOVIE => tas_movie::TasMovieCodec::decode(payload, ctx),
        ProgramKind::BATTLE_TURN_RUNNER => {
            battle_turn_runner::BattleTurnRunnerCodec::decode(payload, ctx)
        }
        ProgramKind::BATTLE_CONTEXT_PROBE => {
            battle_context_probe::BattleContextProbeCodec::decode(payload, ctx)
        }
        _ => Err(CodecError::UnknownKind(tag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_fails_the_job() {
        let mut ctx = ContextStore::new();
        let err = decode_by_tag(&[0xff, 0, 0], &mut ctx).unwrap_err();
        assert_eq!(err, CodecError::UnknownKind(0xff));
    }

    #[test]
    fn empty_payload_is_truncated() {
        let mut ctx = ContextStore::new();
        assert_eq!(decode_by_tag(&[], &mut ctx).unwrap_err(), CodecError::Truncated);
    }
}
