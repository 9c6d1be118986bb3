//! The Phase-Script VM crate: the opcode interpreter, the
//! predicate evaluator, and the four fixed programs built on top of it.

pub mod bpkeys;
pub mod error;
pub mod op;
pub mod predicates;
pub mod programs;
pub mod vm;

pub use error::VmError;
pub use op::{Op, PhaseScript, TimeoutArg, VmProgress};
pub use vm::Vm;
