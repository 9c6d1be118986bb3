//! The Worker Process: a long-lived child that owns
//! exactly one emulator and one VM, and speaks the framed IPC protocol
//! of `tas-ipc` with the parent Runner over its stdin/stdout pipes.

pub mod boot;
pub mod config;
pub mod exit_code;
pub mod lifecycle;
pub mod logging;

pub use config::WorkerConfig;
