//! Context serialization: a trivial length-prefixed key-type-value stream
//!: `{u16 key, u8 type_tag, payload}` repeated, terminated
//! by end-of-buffer. Byte-strings and battle-paths carry their own u32
//! length prefix.

use tas_context::ContextStore;
use tas_types::value::{BattlePath, TurnPlan};
use tas_types::{InputFrame, KeyId, TaggedValue, ValueTag};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("truncated context stream at offset {0}")]
    Truncated(usize),
    #[error("unknown value tag {0} at offset {1}")]
    UnknownTag(u8, usize),
}

pub fn serialize_context(ctx: &ContextStore) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in ctx.iter() {
        out.extend_from_slice(&key.to_le_bytes());
        out.push(value.tag() as u8);
        write_value(&mut out, value);
    }
    out
}

fn write_value(out: &mut Vec<u8>, value: &TaggedValue) {
    match value {
        TaggedValue::U8(v) => out.push(*v),
        TaggedValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
        TaggedValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
        TaggedValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
        TaggedValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        TaggedValue::Bytes(b) => {
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        }
        TaggedValue::Frame(f) => out.extend_from_slice(&f.to_wire()),
        TaggedValue::BattlePath(p) => write_battle_path(out, p),
    }
}

fn write_battle_path(out: &mut Vec<u8>, path: &BattlePath) {
    out.extend_from_slice(&(path.turns.len() as u32).to_le_bytes());
    for turn in &path.turns {
        out.extend_from_slice(&(turn.targets.len() as u32).to_le_bytes());
        out.extend_from_slice(&turn.targets);
        out.extend_from_slice(&turn.fake_attack_count.to_le_bytes());
    }
}

pub fn deserialize_context(bytes: &[u8]) -> Result<ContextStore, WireError> {
    let mut ctx = ContextStore::new();
    let mut off = 0usize;
    while off < bytes.len() {
        let key = read_u16(bytes, off)?;
        off += 2;
        let tag_byte = *bytes.get(off).ok_or(WireError::Truncated(off))?;
        off += 1;
        let tag = ValueTag::from_u8(tag_byte).ok_or(WireError::UnknownTag(tag_byte, off - 1))?;
        let (value, consumed) = read_value(bytes, off, tag)?;
        off += consumed;
        ctx.set_raw(key as KeyId, value);
    }
    Ok(ctx)
}

fn read_u16(bytes: &[u8], off: usize) -> Result<u16, WireError> {
    let slice = bytes
        .get(off..off + 2)
        .ok_or(WireError::Truncated(off))?;
    Ok(u16::from_le_bytes(slice.try_into().unwrap()))
}

fn read_value(
    bytes: &[u8],
    off: usize,
    tag: ValueTag,
) -> Result<(TaggedValue, usize), WireError> {
    match tag {
        ValueTag::U8 => {
            let b = *bytes.get(off).ok_or(WireError::Truncated(off))?;
            Ok((TaggedValue::U8(b), 1))
        }
        ValueTag::U16 => {
            let s = bytes.get(off..off + 2).ok_or(WireError::Truncated(off))?;
            Ok((
                TaggedValue::U16(u16::from_le_bytes(s.try_into().unwrap())),
                2,
            ))
        }
        ValueTag::U32 => {
            let s = bytes.get(off..off + 4).ok_or(WireError::Truncated(off))?;
            Ok((
                TaggedValue::U32(u32::from_le_bytes(s.try_into().unwrap())),
                4,
            ))
        }
        ValueTag::F32 => {
            let s = bytes.get(off..off + 4).ok_or(WireError::Truncated(off))?;
            Ok((
                TaggedValue::F32(f32::from_le_bytes(s.try_into().unwrap())),
                4,
            ))
        }
        ValueTag::F64 => {
            let s = bytes.get(off..off + 8).ok_or(WireError::Truncated(off))?;
            Ok((
                TaggedValue::F64(f64::from_le_bytes(s.try_into().unwrap())),
                8,
            ))
        }
        ValueTag::Bytes => {
            let len = read_u32(bytes, off)? as usize;
            let data = bytes
                .get(off + 4..off + 4 + len)
                .ok_or(WireError::Truncated(off))?
                .to_vec();
            Ok((TaggedValue::Bytes(data), 4 + len))
        }
        ValueTag::Frame => {
            let s: [u8; InputFrame::WIRE_LEN] = bytes
                .get(off..off + InputFrame::WIRE_LEN)
                .ok_or(WireError::Truncated(off))?
                .try_into()
                .unwrap();
            Ok((TaggedValue::Frame(InputFrame::from_wire(s)), InputFrame::WIRE_LEN))
        }
        ValueTag::BattlePath => read_battle_path(bytes, off),
    }
}

fn read_u32(bytes: &[u8], off: usize) -> Result<u32, WireError> {
    let slice = bytes
        .get(off..off + 4)
        .ok_or(WireError::Truncated(off))?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_battle_path(bytes: &[u8], off: usize) -> Result<(TaggedValue, usize), WireError> {
    let mut cursor = off;
    let n_turns = read_u32(bytes, cursor)? as usize;
    cursor += 4;
    let mut turns = Vec::with_capacity(n_turns);
    for _ in 0..n_turns {
        let n_targets = read_u32(bytes, cursor)? as usize;
        cursor += 4;
        let targets = bytes
            .get(cursor..cursor + n_targets)
            .ok_or(WireError::Truncated(cursor))?
            .to_vec();
        cursor += n_targets;
        let fake_attack_count = read_u32(bytes, cursor)?;
        cursor += 4;
        turns.push(TurnPlan {
            targets,
            fake_attack_count,
        });
    }
    Ok((
        TaggedValue::BattlePath(BattlePath { turns }),
        cursor - off,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let mut ctx = ContextStore::new();
        ctx.set(1u16, 7u8);
        ctx.set(2u16, 0xbeefu16);
        ctx.set(3u16, 0xdeadbeefu32);
        ctx.set(4u16, 1.5f32);
        ctx.set(5u16, 2.25f64);
        ctx.set(6u16, vec![1u8, 2, 3]);
        ctx.set(7u16, InputFrame::NEUTRAL);
        ctx.set(
            8u16,
            BattlePath {
                turns: vec![TurnPlan {
                    targets: vec![0, 1],
                    fake_attack_count: 2,
                }],
            },
        );

        let bytes = serialize_context(&ctx);
        let decoded = deserialize_context(&bytes).unwrap();

        assert_eq!(decoded.get::<u8>(1), Some(7));
        assert_eq!(decoded.get::<u16>(2), Some(0xbeef));
        assert_eq!(decoded.get::<u32>(3), Some(0xdeadbeef));
        assert_eq!(decoded.get::<InputFrame>(7), Some(InputFrame::NEUTRAL));
        assert_eq!(decoded.len(), ctx.len());
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let bytes = [1, 0, ValueTag::U32 as u8, 0, 0];
        assert!(matches!(
            deserialize_context(&bytes),
            Err(WireError::Truncated(_))
        ));
    }
}
