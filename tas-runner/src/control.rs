//! Control-plane messages a worker's dedicated thread services between
//! job dispatches. Kept separate from the job queue: control traffic
//! is per-worker (unicast, one request per thread), job traffic is a
//! shared multi-consumer queue (`crate::queue`).

use crossbeam::channel::Sender;
use tas_ipc::SetProgramFrame;

#[derive(Debug, Clone)]
pub enum ControlCommand {
    SetProgram(SetProgramFrame),
    RunInitOnce,
    ActivateMain,
}

/// What the worker thread reports back after attempting a control command.
#[derive(Debug, Clone, Copy)]
pub struct ControlReply {
    pub ok: bool,
}

pub struct ControlRequest {
    pub command: ControlCommand,
    pub reply: Sender<ControlReply>,
}
