//! Deterministic in-memory [`EmulatorHost`] used by the VM's own test
//! suite. Frames are simulated at a fixed 60Hz rather than wall-clock
//! time, so tests that exercise `run-until-bp` finish instantly and
//! reproducibly.

use std::collections::{BTreeSet, HashMap};

use crate::{poll, EmulatorHost, ProgressSink, ProgressTick, RunUntilBpOutcome, StopReason};
use tas_types::InputFrame;

const MS_PER_FRAME: f64 = 1000.0 / 60.0;

#[derive(Clone)]
struct Snapshot {
    memory: HashMap<u32, u8>,
    frame_count: u32,
    input: InputFrame,
}

/// Schedules a breakpoint hit after a fixed number of simulated frames,
/// so a test can script exactly when `run_until_breakpoint` reports a
/// hit without depending on real timing.
#[derive(Clone, Copy)]
struct ScheduledHit {
    pc: u32,
    after_frames: u32,
}

pub struct FakeEmulator {
    memory: HashMap<u32, u8>,
    armed: BTreeSet<u32>,
    input: InputFrame,
    configured_pad: bool,
    frame_count: u32,
    game_loaded: bool,
    movie_playing: bool,
    movie_frames_left: Option<u32>,
    scheduled_hit: Option<ScheduledHit>,
    force_vi_stall: bool,
    saved: Option<Snapshot>,
}

impl Default for FakeEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEmulator {
    pub fn new() -> Self {
        FakeEmulator {
            memory: HashMap::new(),
            armed: BTreeSet::new(),
            input: InputFrame::NEUTRAL,
            configured_pad: false,
            frame_count: 0,
            game_loaded: false,
            movie_playing: false,
            movie_frames_left: None,
            scheduled_hit: None,
            force_vi_stall: false,
            saved: None,
        }
    }

    /// Test setup: write a big-endian scalar directly into fake memory.
    pub fn poke_u8(&mut self, addr: u32, v: u8) {
        self.memory.insert(addr, v);
    }

    pub fn poke_u32(&mut self, addr: u32, v: u32) {
        for (i, byte) in v.to_be_bytes().into_iter().enumerate() {
            self.memory.insert(addr + i as u32, byte);
        }
    }

    pub fn poke_f64(&mut self, addr: u32, v: f64) {
        for (i, byte) in v.to_be_bytes().into_iter().enumerate() {
            self.memory.insert(addr + i as u32, byte);
        }
    }

    /// Arranges for `run_until_breakpoint` to report a hit at `pc` once
    /// `after_frames` simulated frames have elapsed, provided `pc` is
    /// armed at that time.
    pub fn schedule_hit(&mut self, pc: u32, after_frames: u32) {
        self.scheduled_hit = Some(ScheduledHit { pc, after_frames });
    }

    pub fn set_movie_length(&mut self, frames: u32) {
        self.movie_frames_left = Some(frames);
    }

    pub fn set_force_vi_stall(&mut self, stall: bool) {
        self.force_vi_stall = stall;
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    fn read_be<const N: usize>(&self, addr: u32) -> Option<[u8; N]> {
        let mut buf = [0u8; N];
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = *self.memory.get(&(addr + i as u32))?;
        }
        Some(buf)
    }
}

impl EmulatorHost for FakeEmulator {
    fn load_game(&mut self, _iso_path: &str) -> bool {
        self.game_loaded = true;
        true
    }

    fn load_savestate(&mut self, _path: &str) -> bool {
        self.game_loaded
    }

    fn save_snapshot_to_buffer(&mut self) -> Option<Vec<u8>> {
        self.saved = Some(Snapshot {
            memory: self.memory.clone(),
            frame_count: self.frame_count,
            input: self.input,
        });
        Some(vec![1])
    }

    fn load_snapshot_from_buffer(&mut self, buf: &[u8]) -> bool {
        if buf.is_empty() {
            return false;
        }
        match self.saved.clone() {
            Some(snap) => {
                self.memory = snap.memory;
                self.frame_count = snap.frame_count;
                self.input = snap.input;
                true
            }
            None => false,
        }
    }

    fn read_u8(&self, addr: u32) -> Option<u8> {
        self.memory.get(&addr).copied()
    }

    fn read_u16(&self, addr: u32) -> Option<u16> {
        self.read_be::<2>(addr).map(u16::from_be_bytes)
    }

    fn read_u32(&self, addr: u32) -> Option<u32> {
        self.read_be::<4>(addr).map(u32::from_be_bytes)
    }

    fn read_f32(&self, addr: u32) -> Option<f32> {
        self.read_be::<4>(addr).map(f32::from_be_bytes)
    }

    fn read_f64(&self, addr: u32) -> Option<f64> {
        self.read_be::<8>(addr).map(f64::from_be_bytes)
    }

    fn arm_pc_breakpoints(&mut self, pcs: &[u32]) -> bool {
        self.armed.extend(pcs.iter().copied());
        true
    }

    fn disarm_pc_breakpoints(&mut self, pcs: &[u32]) -> bool {
        for pc in pcs {
            self.armed.remove(pc);
        }
        true
    }

    fn clear_all_pc_breakpoints(&mut self) {
        self.armed.clear();
    }

    fn set_input(&mut self, frame: InputFrame) {
        self.input = frame;
    }

    fn configure_port1_standard_pad(&mut self) {
        self.configured_pad = true;
    }

    fn step_one_frame_blocking(&mut self, _timeout_ms: u32) -> bool {
        self.frame_count += 1;
        true
    }

    fn run_until_breakpoint(
        &mut self,
        timeout_ms: u32,
        vi_stall_ms: u32,
        watch_movie: bool,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> RunUntilBpOutcome {
        let mut elapsed_ms: u32 = 0;
        loop {
            self.frame_count += 1;
            elapsed_ms = ((self.frame_count as f64) * MS_PER_FRAME) as u32;

            if let Some(sink) = progress.as_deref_mut() {
                let remaining = timeout_ms.saturating_sub(elapsed_ms);
                let poll_ms = poll::poll_interval_ms(remaining, vi_stall_ms);
                sink.on_progress(ProgressTick {
                    elapsed_ms,
                    cur_frames: self.frame_count,
                    total_frames: self
                        .movie_frames_left
                        .map(|left| left + self.frame_count)
                        .unwrap_or(0),
                    poll_ms,
                });
            }

            if let Some(sched) = self.scheduled_hit {
                if self.frame_count >= sched.after_frames && self.armed.contains(&sched.pc) {
                    self.scheduled_hit = None;
                    return RunUntilBpOutcome {
                        reason: StopReason::Hit,
                        pc: sched.pc,
                        elapsed_ms,
                    };
                }
            }

            if watch_movie {
                if let Some(left) = self.movie_frames_left.as_mut() {
                    if *left == 0 {
                        self.movie_playing = false;
                        return RunUntilBpOutcome {
                            reason: StopReason::MovieEnded,
                            pc: 0,
                            elapsed_ms,
                        };
                    }
                    *left -= 1;
                }
            }

            if self.force_vi_stall && vi_stall_ms > 0 {
                return RunUntilBpOutcome {
                    reason: StopReason::ViStalled,
                    pc: 0,
                    elapsed_ms,
                };
            }

            if elapsed_ms >= timeout_ms {
                return RunUntilBpOutcome {
                    reason: StopReason::Timeout,
                    pc: 0,
                    elapsed_ms,
                };
            }
        }
    }

    fn play_movie(&mut self, _path: &str) -> bool {
        self.movie_playing = true;
        true
    }

    fn end_movie_playback(&mut self, _timeout_ms: u32) -> bool {
        self.movie_playing = false;
        true
    }

    fn is_movie_playing(&self) -> bool {
        self.movie_playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_timeout_with_no_armed_breakpoints() {
        let mut emu = FakeEmulator::new();
        let outcome = emu.run_until_breakpoint(100, 0, false, None);
        assert_eq!(outcome.reason, StopReason::Timeout);
        assert!(!outcome.hit());
    }

    #[test]
    fn scheduled_hit_fires_once_armed() {
        let mut emu = FakeEmulator::new();
        emu.arm_pc_breakpoints(&[0x8010_0000]);
        emu.schedule_hit(0x8010_0000, 5);
        let outcome = emu.run_until_breakpoint(10_000, 0, false, None);
        assert_eq!(outcome.reason, StopReason::Hit);
        assert_eq!(outcome.pc, 0x8010_0000);
    }

    #[test]
    fn scheduled_hit_is_ignored_when_not_armed() {
        let mut emu = FakeEmulator::new();
        emu.schedule_hit(0x8010_0000, 5);
        let outcome = emu.run_until_breakpoint(200, 0, false, None);
        assert_eq!(outcome.reason, StopReason::Timeout);
    }

    #[test]
    fn movie_end_is_reported_when_watched() {
        let mut emu = FakeEmulator::new();
        emu.set_movie_length(3);
        let outcome = emu.run_until_breakpoint(10_000, 0, true, None);
        assert_eq!(outcome.reason, StopReason::MovieEnded);
    }

    #[test]
    fn vi_stall_fires_when_guard_is_active() {
        let mut emu = FakeEmulator::new();
        emu.set_force_vi_stall(true);
        let outcome = emu.run_until_breakpoint(10_000, 500, false, None);
        assert_eq!(outcome.reason, StopReason::ViStalled);
    }

    #[test]
    fn snapshot_round_trips_memory() {
        let mut emu = FakeEmulator::new();
        emu.poke_u32(0x8040_0000, 42);
        let buf = emu.save_snapshot_to_buffer().unwrap();
        emu.poke_u32(0x8040_0000, 99);
        assert!(emu.load_snapshot_from_buffer(&buf));
        assert_eq!(emu.read_u32(0x8040_0000), Some(42));
    }

    #[test]
    fn read_helpers_use_big_endian_layout() {
        let mut emu = FakeEmulator::new();
        emu.poke_f64(0x9000_0000, 1.5);
        assert_eq!(emu.read_f64(0x9000_0000), Some(1.5));
    }
}
