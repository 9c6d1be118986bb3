//! VM failure modes.

use tas_codec::CodecError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VmError {
    #[error("unknown label {0:?} referenced at program-load time")]
    UnknownLabel(&'static str),
    #[error("snapshot restore failed")]
    SnapshotRestoreFailed,
    #[error("snapshot capture failed")]
    SnapshotCaptureFailed,
    #[error("payload decode failed: {0}")]
    Decode(#[from] CodecError),
    #[error("memory read failed at {op} addr=0x{addr:08x}")]
    MemoryReadFailed { op: &'static str, addr: u32 },
    #[error("breakpoint arm failed")]
    ArmFailed,
    #[error("input override failed: key {0} missing or wrong tag")]
    MissingInputFrame(u16),
    #[error("emit-result key {0} missing from context")]
    MissingEmitKey(u16),
    #[error("malformed predicate table: {0}")]
    MalformedPredicateTable(&'static str),
    #[error("malformed plan frame table: {0}")]
    MalformedPlanTable(&'static str),
}
