//! Breakpoint-key constants per program-kind. The actual pcs a real build arms against come
//! from the out-of-scope configuration file; the constructors in `programs/` take them as parameters and
//! these keys are what callers use to supply them.

pub mod seed_probe {
    pub const AFTER_RAND_SEED_SET: u16 = 101;
}

pub mod tas_movie {
    pub const BEFORE_RAND_SEED_SET: u16 = 101;
}

pub mod battle_context {
    pub const CONTEXT_READY: u16 = 301;
}

pub mod battle {
    pub const TURN_INPUTS: u16 = 201;
    pub const VICTORY: u16 = 202;
    pub const DEFEAT: u16 = 203;
}
