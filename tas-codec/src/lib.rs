//! Payload Codec: one codec per program-kind, each
//! producing a payload that starts with a program-kind tag and a strict
//! version word, followed by program-specific fields. Also hosts the
//! Context Store wire serialization used by the IPC RESULT frame
//!.

pub mod battle_context_probe;
pub mod battle_turn_runner;
pub mod dispatch;
pub mod dtm;
pub mod seed_probe;
pub mod tas_movie;
pub mod wire;

pub use dispatch::{decode_by_tag, CodecError};

use tas_context::ContextStore;
use tas_types::ProgramKind;

/// A codec for one program-kind: strict version validation, no backward
/// compatibility within a single program version.
pub trait PayloadCodec {
    type Spec;

    const KIND: ProgramKind;
    const VERSION: u16;

    fn encode(spec: &Self::Spec) -> Vec<u8>;

    /// Validates the tag and version, then populates `ctx` with the
    /// canonical keys the VM program for this kind expects. Fails on any
    /// size/shape mismatch.
    fn decode(bytes: &[u8], ctx: &mut ContextStore) -> Result<(), CodecError>;
}

/// Shared header: `{tag: u8, version: u16}`, little-endian.
pub(crate) fn write_header(out: &mut Vec<u8>, kind: ProgramKind, version: u16) {
    out.push(kind.0);
    out.extend_from_slice(&version.to_le_bytes());
}

pub(crate) fn read_header(bytes: &[u8]) -> Result<(ProgramKind, u16, &[u8]), CodecError> {
    if bytes.len() < 3 {
        return Err(CodecError::Truncated);
    }
    let kind = ProgramKind(bytes[0]);
    let version = u16::from_le_bytes([bytes[1], bytes[2]]);
    Ok((kind, version, &bytes[3..]))
}

pub(crate) fn expect_header(
    bytes: &[u8],
    want: ProgramKind,
    want_version: u16,
) -> Result<&[u8], CodecError> {
    let (kind, version, rest) = read_header(bytes)?;
    if kind != want {
        return Err(CodecError::WrongKind {
            got: kind,
            want,
        });
    }
    if version != want_version {
        return Err(CodecError::VersionMismatch {
            got: version,
            want: want_version,
        });
    }
    Ok(rest)
}

pub(crate) fn take_u32(bytes: &[u8], off: usize) -> Result<(u32, usize), CodecError> {
    let s = bytes.get(off..off + 4).ok_or(CodecError::Truncated)?;
    Ok((u32::from_le_bytes(s.try_into().unwrap()), off + 4))
}

pub(crate) fn take_u16(bytes: &[u8], off: usize) -> Result<(u16, usize), CodecError> {
    let s = bytes.get(off..off + 2).ok_or(CodecError::Truncated)?;
    Ok((u16::from_le_bytes(s.try_into().unwrap()), off + 2))
}

pub(crate) fn take_bytes(bytes: &[u8], off: usize, len: usize) -> Result<(&[u8], usize), CodecError> {
    let s = bytes.get(off..off + len).ok_or(CodecError::Truncated)?;
    Ok((s, off + len))
}

/// Reads a u32 length prefix followed by that many bytes, the
/// "len-prefixed" shape used for `dtm_path`/`save_dir` in the
/// BattleTurnRunner/TasMovie payloads.
pub(crate) fn take_len_prefixed(bytes: &[u8], off: usize) -> Result<(&[u8], usize), CodecError> {
    let (len, off) = take_u32(bytes, off)?;
    take_bytes(bytes, off, len as usize)
}

pub(crate) fn take_frame(bytes: &[u8], off: usize) -> Result<(tas_types::InputFrame, usize), CodecError> {
    let (raw, next) = take_bytes(bytes, off, tas_types::InputFrame::WIRE_LEN)?;
    let arr: [u8; tas_types::InputFrame::WIRE_LEN] = raw.try_into().unwrap();
    Ok((tas_types::InputFrame::from_wire(arr), next))
}
