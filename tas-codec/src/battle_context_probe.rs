//! BattleContextProbe payload codec: `{tag=4, version=1,
//! run_ms, vi_stall_ms}`. Used by the Branch Explorer's `gather_context`
//! step to read the live enemy/slot layout before compiling symbolic plans.

use crate::{expect_header, take_u32, write_header, CodecError, PayloadCodec};
use tas_context::ContextStore;
use tas_registry::keys;
use tas_types::ProgramKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleContextProbeSpec {
    pub run_ms: u32,
    pub vi_stall_ms: u32,
}

pub struct BattleContextProbeCodec;

impl PayloadCodec for BattleContextProbeCodec {
    type Spec = BattleContextProbeSpec;

    const KIND: ProgramKind = ProgramKind::BATTLE_CONTEXT_PROBE;
    const VERSION: u16 = 1;

    fn encode(spec: &Self::Spec) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, Self::KIND, Self::VERSION);
        out.extend_from_slice(&spec.run_ms.to_le_bytes());
        out.extend_from_slice(&spec.vi_stall_ms.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8], ctx: &mut ContextStore) -> Result<(), CodecError> {
        let rest = expect_header(bytes, Self::KIND, Self::VERSION)?;
        let (run_ms, off) = take_u32(rest, 0)?;
        let (vi_stall_ms, _off) = take_u32(rest, off)?;

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
        let spec = BattleContextProbeSpec {
            run_ms: 100_000,
            vi_stall_ms: 2000,
        };
        let bytes = BattleContextProbeCodec::encode(&spec);
        let mut ctx = ContextStore::new();
        BattleContextProbeCodec::decode(&bytes, &mut ctx).unwrap();
        assert_eq!(ctx.get::<u32>(keys::core::RUN_MS), Some(100_000));
        assert_eq!(ctx.get::<u32>(keys::core::VI_STALL_MS), Some(2000));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut bytes = BattleContextProbeCodec::encode(&BattleContextProbeSpec {
            run_ms: 1,
            vi_stall_ms: 1,
        });
        bytes[1] = 9;
        let mut ctx = ContextStore::new();
        assert!(matches!(
            BattleContextProbeCodec::decode(&bytes, &mut ctx),
            Err(CodecError::VersionMismatch { .. })
        ));
    }
}
