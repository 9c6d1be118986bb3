//! Boot phase: ensure the platform directory,
//! boot the emulator against the iso, load the initial savestate,
//! install the input override, and report a ready state.

use std::path::Path;

use tas_emulator::EmulatorHost;
use tas_ipc::{ready_state, ReadyFrame};

use crate::config::WorkerConfig;

/// The `Sys` platform directory lives under the shared, read-only
/// emulator base directory, not the per-worker user directory.
pub fn platform_dir_present(cfg: &WorkerConfig) -> bool {
    Path::new(&cfg.qtbase).join("Sys").is_dir()
}

/// Runs the boot phase against `host`, returning the [`ReadyFrame`] to
/// send to the parent. `ok=1` iff `state == ready_state::OK`.
pub fn boot<H: EmulatorHost>(cfg: &WorkerConfig, host: &mut H) -> ReadyFrame {
    if !platform_dir_present(cfg) {
        return ReadyFrame { ok: 0, state: ready_state::MISSING_PLATFORM_DIR, error: 0 };
    }

    if !host.load_game(&cfg.iso) {
        return ReadyFrame { ok: 0, state: ready_state::BOOT_FAILED, error: 0 };
    }

    if let Some(savestate) = &cfg.savestate {
        if !host.load_savestate(savestate) {
            return ReadyFrame { ok: 0, state: ready_state::GAME_LOAD_FAILED, error: 0 };
        }
    }

    host.configure_port1_standard_pad();

    ReadyFrame { ok: 1, state: ready_state::OK, error: 0 }
}
