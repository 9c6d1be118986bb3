//! Per-module Context Store key tables. Each module owns a reserved id
//! range; adding a key means adding a row to its module's
//! `TABLE` and, if the range is exhausted, widening `RANGE` deliberately.

use crate::{RegistryEntry, ReservedRange};

pub mod core {
    use super::*;

    pub const RANGE: ReservedRange = ReservedRange {
        module: "core",
        min: 0x0000,
        max: 0x00ff,
    };

    pub const RUN_MS: u16 = 0x0001;
    pub const VI_STALL_MS: u16 = 0x0002;
    pub const OUTCOME_CODE: u16 = 0x0003;
    pub const HIT_PC: u16 = 0x0004;
    pub const ELAPSED_MS: u16 = 0x0005;
    pub const PLAN_DONE: u16 = 0x0006;
    pub const ACTIVE_TURN: u16 = 0x0007;
    pub const PRED_PASS_COUNT: u16 = 0x0008;
    pub const PRED_TOTAL_COUNT: u16 = 0x0009;
    pub const PRED_SUCCESS: u16 = 0x000a;
    pub const PRED_FIRST_FAIL_ID: u16 = 0x000b;
    pub const PROGRESS_ENABLED: u16 = 0x000c;

    pub const TABLE: &[RegistryEntry] = &[
        RegistryEntry {
            const_name: "RUN_MS",
            id: RUN_MS,
            string_name: "core.run_ms",
        },
        RegistryEntry {
            const_name: "VI_STALL_MS",
            id: VI_STALL_MS,
            string_name: "core.vi_stall_ms",
        },
        RegistryEntry {
            const_name: "OUTCOME_CODE",
            id: OUTCOME_CODE,
            string_name: "core.outcome_code",
        },
        RegistryEntry {
            const_name: "HIT_PC",
            id: HIT_PC,
            string_name: "core.hit_pc",
        },
        RegistryEntry {
            const_name: "ELAPSED_MS",
            id: ELAPSED_MS,
            string_name: "core.elapsed_ms",
        },
        RegistryEntry {
            const_name: "PLAN_DONE",
            id: PLAN_DONE,
            string_name: "core.plan_done",
        },
        RegistryEntry {
            const_name: "ACTIVE_TURN",
            id: ACTIVE_TURN,
            string_name: "core.active_turn",
        },
        RegistryEntry {
            const_name: "PRED_PASS_COUNT",
            id: PRED_PASS_COUNT,
            string_name: "core.pred_pass_count",
        },
        RegistryEntry {
            const_name: "PRED_TOTAL_COUNT",
            id: PRED_TOTAL_COUNT,
            string_name: "core.pred_total_count",
        },
        RegistryEntry {
            const_name: "PRED_SUCCESS",
            id: PRED_SUCCESS,
            string_name: "core.pred_success",
        },
        RegistryEntry {
            const_name: "PRED_FIRST_FAIL_ID",
            id: PRED_FIRST_FAIL_ID,
            string_name: "core.pred_first_fail_id",
        },
        RegistryEntry {
            const_name: "PROGRESS_ENABLED",
            id: PROGRESS_ENABLED,
            string_name: "core.progress_enabled",
        },
    ];
}

pub mod seed_probe {
    use super::*;

    pub const RANGE: ReservedRange = ReservedRange {
        module: "seed-probe",
        min: 0x0100,
        max: 0x01ff,
    };

    pub const SEED: u16 = 0x0100;
    pub const FRAME: u16 = 0x0101;

    pub const TABLE: &[RegistryEntry] = &[
        RegistryEntry {
            const_name: "SEED",
            id: SEED,
            string_name: "seed.seed",
        },
        RegistryEntry {
            const_name: "FRAME",
            id: FRAME,
            string_name: "seed.frame",
        },
    ];
}

pub mod tas_movie {
    use super::*;

    pub const RANGE: ReservedRange = ReservedRange {
        module: "tas-movie",
        min: 0x0200,
        max: 0x02ff,
    };

    pub const FLAGS: u16 = 0x0200;
    pub const DTM_PATH: u16 = 0x0201;
    pub const SAVE_DIR: u16 = 0x0202;
    pub const GAME_ID: u16 = 0x0203;
    pub const VI_COUNT: u16 = 0x0204;
    pub const INPUT_COUNT: u16 = 0x0205;
    pub const RECORDING_START_TIME: u16 = 0x0206;
    pub const SEED: u16 = 0x0207;

    pub const TABLE: &[RegistryEntry] = &[
        RegistryEntry {
            const_name: "FLAGS",
            id: FLAGS,
            string_name: "movie.flags",
        },
        RegistryEntry {
            const_name: "DTM_PATH",
            id: DTM_PATH,
            string_name: "movie.dtm_path",
        },
        RegistryEntry {
            const_name: "SAVE_DIR",
            id: SAVE_DIR,
            string_name: "movie.save_dir",
        },
        RegistryEntry {
            const_name: "GAME_ID",
            id: GAME_ID,
            string_name: "movie.game_id",
        },
        RegistryEntry {
            const_name: "VI_COUNT",
            id: VI_COUNT,
            string_name: "movie.vi_count",
        },
        RegistryEntry {
            const_name: "INPUT_COUNT",
            id: INPUT_COUNT,
            string_name: "movie.input_count",
        },
        RegistryEntry {
            const_name: "RECORDING_START_TIME",
            id: RECORDING_START_TIME,
            string_name: "movie.recording_start_time",
        },
        RegistryEntry {
            const_name: "SEED",
            id: SEED,
            string_name: "movie.seed",
        },
    ];
}

pub mod battle {
    use super::*;

    pub const RANGE: ReservedRange = ReservedRange {
        module: "battle",
        min: 0x0300,
        max: 0x04ff,
    };

    pub const INITIAL_FRAME: u16 = 0x0300;
    pub const N_PLANS: u16 = 0x0301;
    pub const PLAN_FRAME_TABLE: u16 = 0x0302;
    pub const PLAN_FRAME_COUNTS: u16 = 0x0303;
    pub const PREDICATE_TABLE: u16 = 0x0304;
    pub const PREDICATE_BASELINES: u16 = 0x0305;
    pub const OUTCOME: u16 = 0x0306;
    pub const PLAN_CURSOR: u16 = 0x0307;
    pub const LAST_TURN_IDX: u16 = 0x0308;
    pub const ENEMY_ALIVE_MASK: u16 = 0x0309;

    pub const TABLE: &[RegistryEntry] = &[
        RegistryEntry {
            const_name: "INITIAL_FRAME",
            id: INITIAL_FRAME,
            string_name: "battle.initial_frame",
        },
        RegistryEntry {
            const_name: "N_PLANS",
            id: N_PLANS,
            string_name: "battle.n_plans",
        },
        RegistryEntry {
            const_name: "PLAN_FRAME_TABLE",
            id: PLAN_FRAME_TABLE,
            string_name: "battle.plan_frame_table",
        },
        RegistryEntry {
            const_name: "PLAN_FRAME_COUNTS",
            id: PLAN_FRAME_COUNTS,
            string_name: "battle.plan_frame_counts",
        },
        RegistryEntry {
            const_name: "PREDICATE_TABLE",
            id: PREDICATE_TABLE,
            string_name: "battle.predicate_table",
        },
        RegistryEntry {
            const_name: "PREDICATE_BASELINES",
            id: PREDICATE_BASELINES,
            string_name: "battle.predicate_baselines",
        },
        RegistryEntry {
            const_name: "OUTCOME",
            id: OUTCOME,
            string_name: "battle.outcome",
        },
        RegistryEntry {
            const_name: "PLAN_CURSOR",
            id: PLAN_CURSOR,
            string_name: "battle.plan_cursor",
        },
        RegistryEntry {
            const_name: "LAST_TURN_IDX",
            id: LAST_TURN_IDX,
            string_name: "battle.last_turn_idx",
        },
        RegistryEntry {
            const_name: "ENEMY_ALIVE_MASK",
            id: ENEMY_ALIVE_MASK,
            string_name: "battle.enemy_alive_mask",
        },
    ];
}
