//! DTM movie header parsing: the movie file
//! is consumed as opaque bytes except for header-based metadata extraction,
//! used by the TasMovie codec to populate `movie.game_id`/`movie.vi_count`/
//! `movie.input_count`/`movie.recording_start_time`.

/// Fixed byte offsets into a DTM header, matching the on-disk Dolphin
/// Tool Movie format.
const OFF_SIGNATURE: usize = 0x000;
const OFF_GAME_ID: usize = 0x004;
const OFF_VI_COUNT: usize = 0x00D;
const OFF_INPUT_COUNT: usize = 0x015;
const OFF_RECORDING_START_TIME: usize = 0x081;
const MIN_HEADER: usize = 0x100;
const SIGNATURE: &[u8; 4] = b"DTM\x1A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtmHeader {
    pub game_id: [u8; 6],
    pub vi_count: u64,
    pub input_count: u64,
    pub recording_start_time: u64,
}

fn read_le_u64(bytes: &[u8], off: usize, width: usize) -> u64 {
    let mut v: u64 = 0;
    for i in 0..width {
        v |= (bytes[off + i] as u64) << (8 * i);
    }
    v
}

/// Parses a DTM header from raw file bytes. Returns `None` if the buffer is
/// shorter than the fixed header region or the signature doesn't match.
pub fn parse(bytes: &[u8]) -> Option<DtmHeader> {
    if bytes.len() < MIN_HEADER {
        return None;
    }
    if &bytes[OFF_SIGNATURE..OFF_SIGNATURE + 4] != SIGNATURE {
        return None;
    }
    let mut game_id = [0u8; 6];
    game_id.copy_from_slice(&bytes[OFF_GAME_ID..OFF_GAME_ID + 6]);
    Some(DtmHeader {
        game_id,
        vi_count: read_le_u64(bytes, OFF_VI_COUNT, 8),
        input_count: read_le_u64(bytes, OFF_INPUT_COUNT, 8),
        recording_start_time: read_le_u64(bytes, OFF_RECORDING_START_TIME, 8),
    })
}

/// Conservative run-time estimate from VI/input counts, used by the
/// TasMovie codec when the payload's `run_ms` is `0`.
pub fn estimate_run_ms(vi_count: u64, input_count: u64, headroom: f64) -> u32 {
    let base = if vi_count != 0 { vi_count } else { input_count };
    if base == 0 {
        return 60_000;
    }
    let headroom = if headroom > 1.0 { headroom } else { 1.0 };
    let ms = (base as f64) * (1000.0 / 60.0) * headroom;
    let msi = (ms + 0.5) as u64;
    msi.clamp(1000, 60 * 60 * 1000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(vi: u64, input: u64) -> Vec<u8> {
        let mut buf = vec![0u8; MIN_HEADER];
        buf[OFF_SIGNATURE..OFF_SIGNATURE + 4].copy_from_slice(SIGNATURE);
        buf[OFF_GAME_ID..OFF_GAME_ID + 6].copy_from_slice(b"GSOE8P");
        buf[OFF_VI_COUNT..OFF_VI_COUNT + 8].copy_from_slice(&vi.to_le_bytes());
        buf[OFF_INPUT_COUNT..OFF_INPUT_COUNT + 8].copy_from_slice(&input.to_le_bytes());
        buf
    }

    #[test]
    fn parses_valid_header() {
        let buf = sample_header(600, 590);
        let h = parse(&buf).unwrap();
        assert_eq!(&h.game_id, b"GSOE8P");
        assert_eq!(h.vi_count, 600);
        assert_eq!(h.input_count, 590);
    }

    #[test]
    fn rejects_short_or_bad_signature() {
        assert!(parse(&[0u8; 10]).is_none());
        let mut buf = sample_header(1, 1);
        buf[0] = b'X';
        assert!(parse(&buf).is_none());
    }

    #[test]
    fn estimate_uses_vi_over_input_and_clamps() {
        assert_eq!(estimate_run_ms(0, 0, 1.0), 60_000);
        assert!(estimate_run_ms(60, 0, 1.0) >= 1000);
        assert_eq!(estimate_run_ms(1_000_000_000, 0, 1.0), 60 * 60 * 1000);
    }
}
