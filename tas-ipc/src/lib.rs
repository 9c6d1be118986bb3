//! The framed binary transport: length-prefixed or
//! fixed-size binary structures in little-endian, spoken by the parent
//! Runner and each Worker over the anonymous pipes created at
//! child-spawn time. Every frame begins with a `u32` tag; the reader
//! dispatches on the tag to the per-tag decoder. Short reads or tag
//! mismatches close the pipe.

pub mod tag {
    pub const READY: u32 = 0x01;
    pub const JOB: u32 = 0x02;
    pub const RESULT: u32 = 0x03;
    pub const PROGRESS: u32 = 0x04;
    pub const SET_PROGRAM: u32 = 0x10;
    pub const RUN_INIT_ONCE: u32 = 0x11;
    pub const ACTIVATE_MAIN: u32 = 0x12;
    pub const ACK: u32 = 0x13;
}

/// `ack.code` values: Success, Invalid, Aborted.
pub mod ack_code {
    pub const SUCCESS: u8 = b'S';
    pub const INVALID: u8 = b'I';
    pub const ABORTED: u8 = b'A';
}

/// `ready.state` values, mirroring the worker boot outcomes of spec.md §4.5.
pub mod ready_state {
    pub const OK: u8 = 0;
    pub const MISSING_PLATFORM_DIR: u8 = 1;
    pub const BOOT_FAILED: u8 = 2;
    pub const GAME_LOAD_FAILED: u8 = 3;
    pub const VM_INIT_FAILED: u8 = 4;
}

use std::io::{self, Read, Write};
use thiserror::Error;

const SAVESTATE_PATH_LEN: usize = 260;
const PROGRESS_TEXT_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("transport io error: {0}")]
    Io(#[from] io::Error),
    #[error("short read: expected {expected} bytes, pipe closed early")]
    ShortRead { expected: usize },
    #[error("unrecognized frame tag 0x{0:08x}")]
    UnknownTag(u32),
    #[error("payload_len {0} exceeds the configured maximum")]
    PayloadTooLarge(u32),
    #[error("path exceeds the fixed {field} field width")]
    PathTooLong { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyFrame {
    pub ok: u8,
    pub state: u8,
    pub error: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFrame {
    pub job_id: u64,
    pub epoch: u32,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFrame {
    pub job_id: u64,
    pub epoch: u32,
    pub ok: u8,
    pub err: u8,
    pub ctx: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressFrame {
    pub job_id: u64,
    pub epoch: u32,
    pub phase: u32,
    pub cur_frames: u32,
    pub total_frames: u32,
    pub elapsed_ms: u32,
    pub flags: u32,
    pub poll_ms: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetProgramFrame {
    pub init_kind: u8,
    pub main_kind: u8,
    pub timeout_ms: u32,
    pub savestate_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub ok: u8,
    pub code: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Ready(ReadyFrame),
    Job(JobFrame),
    Result(ResultFrame),
    Progress(ProgressFrame),
    SetProgram(SetProgramFrame),
    RunInitOnce,
    ActivateMain,
    Ack(AckFrame),
}

/// Maximum payload/context size accepted on read; guards against a
/// corrupted length prefix turning into an unbounded allocation.
pub const MAX_BODY_BYTES: u32 = 256 * 1024 * 1024;

fn write_u32(w: &mut impl Write, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_u64(w: &mut impl Write, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u32(r: &mut impl Read) -> Result<u32, IpcError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> Result<u64, IpcError> {
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u8(r: &mut impl Read) -> Result<u8, IpcError> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf)?;
    Ok(buf[0])
}

/// `Read::read_exact` maps EOF to `UnexpectedEof`; we surface that as our
/// own `ShortRead` so callers can treat it uniformly as "pipe closed".
fn read_exact(r: &mut impl Read, buf: &mut [u8]) -> Result<(), IpcError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            IpcError::ShortRead { expected: buf.len() }
        } else {
            IpcError::Io(e)
        }
    })
}

fn write_fixed_str(w: &mut impl Write, s: &str, width: usize, field: &'static str) -> Result<(), IpcError> {
    let bytes = s.as_bytes();
    if bytes.len() >= width {
        return Err(IpcError::PathTooLong { field });
    }
    let mut buf = vec![0u8; width];
    buf[..bytes.len()].copy_from_slice(bytes);
    w.write_all(&buf)?;
    Ok(())
}

fn read_fixed_str(r: &mut impl Read, width: usize) -> Result<String, IpcError> {
    let mut buf = vec![0u8; width];
    read_exact(r, &mut buf)?;
    let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..nul]).into_owned())
}

/// Writes `frame` as a length-tagged wire message.
pub fn write_frame(w: &mut impl Write, frame: &Frame) -> Result<(), IpcError> {
    match frame {
        Frame::Ready(f) => {
            write_u32(w, tag::READY)?;
            w.write_all(&[f.ok, f.state])?;
            write_u32(w, f.error)?;
        }
        Frame::Job(f) => {
            write_u32(w, tag::JOB)?;
            write_u64(w, f.job_id)?;
            write_u32(w, f.epoch)?;
            write_u32(w, f.payload.len() as u32)?;
            w.write_all(&f.payload)?;
        }
        Frame::Result(f) => {
            write_u32(w, tag::RESULT)?;
            write_u64(w, f.job_id)?;
            write_u32(w, f.epoch)?;
            w.write_all(&[f.ok, f.err])?;
            write_u32(w, f.ctx.len() as u32)?;
            w.write_all(&f.ctx)?;
        }
        Frame::Progress(f) => {
            write_u32(w, tag::PROGRESS)?;
            write_u64(w, f.job_id)?;
            write_u32(w, f.epoch)?;
            write_u32(w, f.phase)?;
            write_u32(w, f.cur_frames)?;
            write_u32(w, f.total_frames)?;
            write_u32(w, f.elapsed_ms)?;
            write_u32(w, f.flags)?;
            write_u32(w, f.poll_ms)?;
            write_fixed_str(w, &f.text, PROGRESS_TEXT_LEN, "progress.text")?;
        }
        Frame::SetProgram(f) => {
            write_u32(w, tag::SET_PROGRAM)?;
            w.write_all(&[f.init_kind, f.main_kind])?;
            write_u32(w, f.timeout_ms)?;
            write_fixed_str(w, &f.savestate_path, SAVESTATE_PATH_LEN, "savestate_path")?;
        }
        Frame::RunInitOnce => {
            write_u32(w, tag::RUN_INIT_ONCE)?;
        }
        Frame::ActivateMain => {
            write_u32(w, tag::ACTIVATE_MAIN)?;
        }
        Frame::Ack(f) => {
            write_u32(w, tag::ACK)?;
            w.write_all(&[f.ok, f.code])?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Reads the next frame from `r`. Returns `ShortRead` on EOF between
/// frames or mid-body.
pub fn read_frame(r: &mut impl Read) -> Result<Frame, IpcError> {
    let tag = read_u32(r)?;
    match tag {
        tag::READY => {
            let ok = read_u8(r)?;
            let state = read_u8(r)?;
            let error = read_u32(r)?;
            Ok(Frame::Ready(ReadyFrame { ok, state, error }))
        }
        tag::JOB => {
            let job_id = read_u64(r)?;
            let epoch = read_u32(r)?;
            let payload_len = read_u32(r)?;
            if payload_len > MAX_BODY_BYTES {
                return Err(IpcError::PayloadTooLarge(payload_len));
            }
            let mut payload = vec![0u8; payload_len as usize];
            read_exact(r, &mut payload)?;
            Ok(Frame::Job(JobFrame { job_id, epoch, payload }))
        }
        tag::RESULT => {
            let job_id = read_u64(r)?;
            let epoch = read_u32(r)?;
            let ok = read_u8(r)?;
            let err = read_u8(r)?;
            let ctx_len = read_u32(r)?;
            if ctx_len > MAX_BODY_BYTES {
                return Err(IpcError::PayloadTooLarge(ctx_len));
            }
            let mut ctx = vec![0u8; ctx_len as usize];
            read_exact(r, &mut ctx)?;
            Ok(Frame::Result(ResultFrame { job_id, epoch, ok, err, ctx }))
        }
        tag::PROGRESS => {
            let job_id = read_u64(r)?;
            let epoch = read_u32(r)?;
            let phase = read_u32(r)?;
            let cur_frames = read_u32(r)?;
            let total_frames = read_u32(r)?;
            let elapsed_ms = read_u32(r)?;
            let flags = read_u32(r)?;
            let poll_ms = read_u32(r)?;
            let text = read_fixed_str(r, PROGRESS_TEXT_LEN)?;
            Ok(Frame::Progress(ProgressFrame {
                job_id,
                epoch,
                phase,
                cur_frames,
                total_frames,
                elapsed_ms,
                flags,
                poll_ms,
                text,
            }))
        }
        tag::SET_PROGRAM => {
            let init_kind = read_u8(r)?;
            let main_kind = read_u8(r)?;
            let timeout_ms = read_u32(r)?;
            let savestate_path = read_fixed_str(r, SAVESTATE_PATH_LEN)?;
            Ok(Frame::SetProgram(SetProgramFrame {
                init_kind,
                main_kind,
                timeout_ms,
                savestate_path,
            }))
        }
        tag::RUN_INIT_ONCE => Ok(Frame::RunInitOnce),
        tag::ACTIVATE_MAIN => Ok(Frame::ActivateMain),
        tag::ACK => {
            let ok = read_u8(r)?;
            let code = read_u8(r)?;
            Ok(Frame::Ack(AckFrame { ok, code }))
        }
        other => Err(IpcError::UnknownTag(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(frame: Frame) -> Frame {
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).unwrap();
        let mut cursor = Cursor::new(buf);
        read_frame(&mut cursor).unwrap()
    }

    #[test]
    fn ready_round_trips() {
        let f = Frame::Ready(ReadyFrame { ok: 1, state: ready_state::OK, error: 0 });
        assert_eq!(round_trip(f.clone()), f);
    }

    #[test]
    fn job_round_trips_with_payload() {
        let f = Frame::Job(JobFrame {
            job_id: 42,
            epoch: 3,
            payload: vec![1, 2, 3, 4, 5],
        });
        assert_eq!(round_trip(f.clone()), f);
    }

    #[test]
    fn result_round_trips_with_empty_ctx() {
        let f = Frame::Result(ResultFrame {
            job_id: 1,
            epoch: 1,
            ok: 0,
            err: 4,
            ctx: vec![],
        });
        assert_eq!(round_trip(f.clone()), f);
    }

    #[test]
    fn progress_text_truncates_at_first_nul() {
        let f = Frame::Progress(ProgressFrame {
            job_id: 1,
            epoch: 1,
            phase: 0,
            cur_frames: 10,
            total_frames: 20,
            elapsed_ms: 100,
            flags: 0,
            poll_ms: 50,
            text: "turn 2/3".to_string(),
        });
        assert_eq!(round_trip(f.clone()), f);
    }

    #[test]
    fn set_program_round_trips_path() {
        let f = Frame::SetProgram(SetProgramFrame {
            init_kind: 1,
            main_kind: 3,
            timeout_ms: 60_000,
            savestate_path: "/tmp/save.state".to_string(),
        });
        assert_eq!(round_trip(f.clone()), f);
    }

    #[test]
    fn control_frames_with_no_body_round_trip() {
        assert_eq!(round_trip(Frame::RunInitOnce), Frame::RunInitOnce);
        assert_eq!(round_trip(Frame::ActivateMain), Frame::ActivateMain);
    }

    #[test]
    fn ack_round_trips() {
        let f = Frame::Ack(AckFrame { ok: 1, code: ack_code::SUCCESS });
        assert_eq!(round_trip(f.clone()), f);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0xdead).unwrap();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor), Err(IpcError::UnknownTag(0xdead))));
    }

    #[test]
    fn short_read_is_reported() {
        let mut buf = Vec::new();
        write_u32(&mut buf, tag::JOB).unwrap();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor), Err(IpcError::ShortRead { .. })));
    }

    #[test]
    fn path_too_long_is_rejected_at_write_time() {
        let f = Frame::SetProgram(SetProgramFrame {
            init_kind: 0,
            main_kind: 0,
            timeout_ms: 0,
            savestate_path: "x".repeat(SAVESTATE_PATH_LEN),
        });
        let mut buf = Vec::new();
        assert!(matches!(
            write_frame(&mut buf, &f),
            Err(IpcError::PathTooLong { .. })
        ));
    }

    #[test]
    fn oversized_payload_len_is_rejected_before_allocating() {
        let mut buf = Vec::new();
        write_u32(&mut buf, tag::JOB).unwrap();
        write_u64(&mut buf, 1).unwrap();
        write_u32(&mut buf, 1).unwrap();
        write_u32(&mut buf, MAX_BODY_BYTES + 1).unwrap();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_frame(&mut cursor),
            Err(IpcError::PayloadTooLarge(_))
        ));
    }
}
