//! SeedProbe payload codec: `{tag=1, version=1, run_ms: u32,
//! vi_stall_ms: u32, frame: InputFrame}`.

use crate::{expect_header, take_frame, take_u32, write_header, CodecError, PayloadCodec};
use tas_context::ContextStore;
use tas_registry::keys;
use tas_types::{InputFrame, ProgramKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedProbeSpec {
    pub frame: InputFrame,
    pub run_ms: u32,
    pub vi_stall_ms: u32,
}

pub struct SeedProbeCodec;

impl PayloadCodec for SeedProbeCodec {
    type Spec = SeedProbeSpec;

    const KIND: ProgramKind = ProgramKind::SEED_PROBE;
    const VERSION: u16 = 1;

    fn encode(spec: &Self::Spec) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, Self::KIND, Self::VERSION);
        out.extend_from_slice(&spec.run_ms.to_le_bytes());
        out.extend_from_slice(&spec.vi_stall_ms.to_le_bytes());
        out.extend_from_slice(&spec.frame.to_wire());
        out
    }

    fn decode(bytes: &[u8], ctx: &mut ContextStore) -> Result<(), CodecError> {
        let rest = expect_header(bytes, Self::KIND, Self::VERSION)?;
        let (run_ms, off) = take_u32(rest, 0)?;
        let (vi_stall_ms, off) = take_u32(rest, off)?;
        let (frame, _off) = take_frame(rest, off)?;

        ctx.set(keys::seed_probe::FRAME, frame);
        if run_ms != 0 {
            ctx.set(keys::core::RUN_MS, run_ms);
        }
        if vi_stall_ms != 0 {
            ctx.set(keys::core::VI_STALL_MS, vi_stall_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_decode() {
        let spec = SeedProbeSpec {
            frame: InputFrame::NEUTRAL,
            run_ms: 5000,
            vi_stall_ms: 0,
        };
        let bytes = SeedProbeCodec::encode(&spec);
        let mut ctx = ContextStore::new();
        SeedProbeCodec::decode(&bytes, &mut ctx).unwrap();
        assert_eq!(
            ctx.get::<InputFrame>(keys::seed_probe::FRAME),
            Some(InputFrame::NEUTRAL)
        );
        assert_eq!(ctx.get::<u32>(keys::core::RUN_MS), Some(5000));
        assert_eq!(ctx.get::<u32>(keys::core::VI_STALL_MS), None);
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let bytes = crate::battle_context_probe::BattleContextProbeCodec::encode(
            &crate::battle_context_probe::BattleContextProbeSpec {
                run_ms: 1,
                vi_stall_ms: 1,
            },
        );
        let mut ctx = ContextStore::new();
        assert!(matches!(
            SeedProbeCodec::decode(&bytes, &mut ctx),
            Err(CodecError::WrongKind { .. })
        ));
    }
}
