//! The Branch Explorer: compiles symbolic [`UIConfig`]
//! plans into concrete `BattleTurnRunner` jobs and submits them to a
//! [`tas_runner::Runner`] with bounded retry.
//!
//! Compilation happens in three independent stages, each grounded in its
//! own module: per-turn backtracking ([`compile`]), joining turns and
//! expanding the fake-attack budget ([`cartesian`]), and translating the
//! abstract per-turn target bits into concrete controller input
//! ([`translate`]). [`explorer`] wires the three together against a live
//! fleet.

pub mod cartesian;
pub mod compile;
pub mod error;
pub mod explorer;
pub mod plan;
pub mod seed_delta;
pub mod translate;
pub mod ui_config;

pub use error::ExplorerError;
pub use explorer::{BranchExplorer, ExplorerRun};
pub use seed_delta::{
    RngSeedDeltaArgs, SeedDeltaComboEntry, SeedDeltaComboResult, SeedDeltaExplorer, SeedFamily, SeedProbeEntry, SeedProbeGridResult,
};
pub use translate::{DefaultFrameTranslator, FrameTranslator};
pub use ui_config::{TargetBinding, UIAction, UIConfig, UITurn};
