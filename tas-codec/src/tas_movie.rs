//! TasMovie payload codec: `{tag=2, version=1, flags: u16,
//! run_ms: u32, vi_stall_ms: u32, dtm_path: len-prefixed, save_dir:
//! len-prefixed}`.
//!
//! Decoding reads the DTM file's header
//! to populate `movie.game_id`/`movie.vi_count`/`movie.input_count`/
//! `movie.recording_start_time`, and to derive `run_ms` when the payload
//! asked for it to be inferred (`run_ms == 0`).

use crate::{expect_header, take_len_prefixed, take_u16, take_u32, write_header, CodecError, PayloadCodec};
use tas_context::ContextStore;
use tas_registry::keys;
use tas_types::ProgramKind;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TasMovieFlags: u16 {
        const SAVE_ON_FAIL = 1 << 0;
        const PROGRESS_ENABLE = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasMovieSpec {
    pub flags: TasMovieFlags,
    pub run_ms: u32,
    pub vi_stall_ms: u32,
    pub dtm_path: String,
    pub save_dir: String,
}

pub struct TasMovieCodec;

impl PayloadCodec for TasMovieCodec {
    type Spec = TasMovieSpec;

    const KIND: ProgramKind = ProgramKind::TAS_MOVIE;
    const VERSION: u16 = 1;

    fn encode(spec: &Self::Spec) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, Self::KIND, Self::VERSION);
        out.extend_from_slice(&spec.flags.bits().to_le_bytes());
        out.extend_from_slice(&spec.run_ms.to_le_bytes());
        out.extend_from_slice(&spec.vi_stall_ms.to_le_bytes());
        out.extend_from_slice(&(spec.dtm_path.len() as u32).to_le_bytes());
        out.extend_from_slice(spec.dtm_path.as_bytes());
        out.extend_from_slice(&(spec.save_dir.len() as u32).to_le_bytes());
        out.extend_from_slice(spec.save_dir.as_bytes());
        out
    }

    fn decode(bytes: &[u8], ctx: &mut ContextStore) -> Result<(), CodecError> {
        let rest = expect_header(bytes, Self::KIND, Self::VERSION)?;
        let (flags_bits, off) = take_u16(rest, 0)?;
        let flags = TasMovieFlags::from_bits_truncate(flags_bits);
        let (run_ms, off) = take_u32(rest, off)?;
        let (vi_stall_ms, off) = take_u32(rest, off)?;
        let (dtm_path, off) = take_len_prefixed(rest, off)?;
        let (save_dir, _off) = take_len_prefixed(rest, off)?;

        let dtm_path = dtm_path.to_vec();
        let save_dir = save_dir.to_vec();

        ctx.set(keys::tas_movie::FLAGS, flags_bits);
        ctx.set(keys::tas_movie::DTM_PATH, dtm_path.clone());
        ctx.set(keys::tas_movie::SAVE_DIR, save_dir);

        let header = std::fs::read(String::from_utf8_lossy(&dtm_path).as_ref())
.ok()
.and_then(|bytes| crate::dtm::parse(&bytes));

        let derived_run_ms = if run_ms != 0 {
            Some(run_ms)
        } else {
            header
.as_ref()
.map(|h| crate::dtm::estimate_run_ms(h.vi_count, h.input_count, 1.5))
        };
        if let Some(ms) = derived_run_ms {
            ctx.set(keys::core::RUN_MS, ms);
        }
        if vi_stall_ms != 0 {
            ctx.set(keys::core::VI_STALL_MS, vi_stall_ms);
        }
        if let Some(h) = header {
            ctx.set(keys::tas_movie::GAME_ID, h.game_id.to_vec());
            ctx.set(keys::tas_movie::VI_COUNT, h.vi_count as u32);
            ctx.set(keys::tas_movie::INPUT_COUNT, h.input_count as u32);
            ctx.set(
                keys::tas_movie::RECORDING_START_TIME,
                h.recording_start_time as u32,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_paths_and_flags_without_dtm_on_disk() {
        let spec = TasMovieSpec {
            flags: TasMovieFlags::SAVE_ON_FAIL,
            run_ms: 12_000,
            vi_stall_ms: 2000,
            dtm_path: "/nonexistent/movie.dtm".to_string(),
            save_dir: "/tmp/saves".to_string(),
        };
        let bytes = TasMovieCodec::encode(&spec);
        let mut ctx = ContextStore::new();
        TasMovieCodec::decode(&bytes, &mut ctx).unwrap();

        assert_eq!(ctx.get::<u16>(keys::tas_movie::FLAGS), Some(1));
        assert_eq!(ctx.get::<u32>(keys::core::RUN_MS), Some(12_000));
        assert_eq!(ctx.get::<u32>(keys::core::VI_STALL_MS), Some(2000));
        let path: Vec<u8> = ctx.get(keys::tas_movie::DTM_PATH).unwrap();
        assert_eq!(path, spec.dtm_path.as_bytes());
    }

    #[test]
    fn reads_dtm_header_when_file_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.dtm");
        let mut buf = vec![0u8; 0x100];
        buf[0..4].copy_from_slice(b"DTM\x1a");
        buf[0x004..0x00a].copy_from_slice(b"GSOE8P");
        buf[0x00d..0x015].copy_from_slice(&600u64.to_le_bytes());
        buf[0x015..0x01d].copy_from_slice(&590u64.to_le_bytes());
        std::fs::write(&path, &buf).unwrap();

        let spec = TasMovieSpec {
            flags: TasMovieFlags::empty(),
            run_ms: 0,
            vi_stall_ms: 0,
            dtm_path: path.to_string_lossy().into_owned(),
            save_dir: dir.path().to_string_lossy().into_owned(),
        };
        let bytes = TasMovieCodec::encode(&spec);
        let mut ctx = ContextStore::new();
        TasMovieCodec::decode(&bytes, &mut ctx).unwrap();

        assert_eq!(ctx.get::<u32>(keys::tas_movie::VI_COUNT), Some(600));
        assert_eq!(ctx.get::<u32>(keys::tas_movie::INPUT_COUNT), Some(590));
        assert!(ctx.get::<u32>(keys::core::RUN_MS).unwrap() > 0);
    }
}
