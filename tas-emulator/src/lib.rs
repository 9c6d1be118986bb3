//! Emulator host trait: the seam between the VM's
//! `run-until-bp`/`step-frames`/memory-read ops and whatever actually
//! drives the emulated console. The real embedded emulator is an
//! external collaborator outside this crate's scope; [`fake::FakeEmulator`]
//! is a deterministic stand-in used by the VM's own tests.

pub mod fake;
pub mod poll;

use tas_types::InputFrame;

/// Why `run_until_breakpoint` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Hit,
    Timeout,
    ViStalled,
    MovieEnded,
    Aborted,
}

/// Result of a single `run_until_breakpoint` call.
#[derive(Debug, Clone, Copy)]
pub struct RunUntilBpOutcome {
    pub reason: StopReason,
    /// Program counter of the breakpoint that was hit. Meaningless unless
    /// `reason == StopReason::Hit`.
    pub pc: u32,
    pub elapsed_ms: u32,
}

impl RunUntilBpOutcome {
    pub fn hit(&self) -> bool {
        self.reason == StopReason::Hit
    }
}

/// A single tick of progress during a long `run_until_breakpoint` call,
/// handed to a [`ProgressSink`] at the cadence chosen by [`poll`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressTick {
    pub elapsed_ms: u32,
    pub cur_frames: u32,
    pub total_frames: u32,
    pub poll_ms: u32,
}

pub trait ProgressSink {
    fn on_progress(&mut self, tick: ProgressTick);
}

impl<F: FnMut(ProgressTick)> ProgressSink for F {
    fn on_progress(&mut self, tick: ProgressTick) {
        self(tick)
    }
}

/// The emulator-facing operations the VM needs. Multi-byte reads return
/// the platform's native (big-endian) byte order already converted to a
/// host integer/float.
pub trait EmulatorHost {
    fn load_game(&mut self, iso_path: &str) -> bool;
    fn load_savestate(&mut self, path: &str) -> bool;

    fn save_snapshot_to_buffer(&mut self) -> Option<Vec<u8>>;
    fn load_snapshot_from_buffer(&mut self, buf: &[u8]) -> bool;

    fn read_u8(&self, addr: u32) -> Option<u8>;
    fn read_u16(&self, addr: u32) -> Option<u16>;
    fn read_u32(&self, addr: u32) -> Option<u32>;
    fn read_f32(&self, addr: u32) -> Option<f32>;
    fn read_f64(&self, addr: u32) -> Option<f64>;

    fn arm_pc_breakpoints(&mut self, pcs: &[u32]) -> bool;
    fn disarm_pc_breakpoints(&mut self, pcs: &[u32]) -> bool;
    fn clear_all_pc_breakpoints(&mut self);

    fn set_input(&mut self, frame: InputFrame);
    fn configure_port1_standard_pad(&mut self);

    fn step_one_frame_blocking(&mut self, timeout_ms: u32) -> bool;

    /// Runs frames until an armed breakpoint is hit, the movie ends (when
    /// `watch_movie` is set), the vi-stall guard fires, or `timeout_ms`
    /// elapses. `progress`, if present, is invoked at the cadence chosen
    /// by [`poll::poll_interval_ms`].
    fn run_until_breakpoint(
        &mut self,
        timeout_ms: u32,
        vi_stall_ms: u32,
        watch_movie: bool,
        progress: Option<&mut dyn ProgressSink>,
    ) -> RunUntilBpOutcome;

    fn play_movie(&mut self, path: &str) -> bool;
    fn end_movie_playback(&mut self, timeout_ms: u32) -> bool;
    fn is_movie_playing(&self) -> bool;
}
