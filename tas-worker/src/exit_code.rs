//! Worker process exit codes.

pub const CLEAN: i32 = 0;
pub const INVALID_HANDLES: i32 = 100;
pub const MISSING_PLATFORM_DIR: i32 = 1;
pub const BOOT_FAILED: i32 = 2;
pub const GAME_LOAD_FAILED: i32 = 3;
pub const VM_INIT_FAILED: i32 = 4;

/// Maps a [`tas_ipc::ready_state`] value to the matching boot-phase exit
/// code.
pub fn from_ready_state(state: u8) -> i32 {
    match state {
        tas_ipc::ready_state::MISSING_PLATFORM_DIR => MISSING_PLATFORM_DIR,
        tas_ipc::ready_state::BOOT_FAILED => BOOT_FAILED,
        tas_ipc::ready_state::GAME_LOAD_FAILED => GAME_LOAD_FAILED,
        _ => VM_INIT_FAILED,
    }
}
