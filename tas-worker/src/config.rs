//! Worker CLI.

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[clap(author, version, about, long_about = None)]
pub struct WorkerConfig {
    #[clap(long, env = "TAS_WORKER_ID", help = "Worker id, assigned by the runner")]
    pub id: u32,

    #[clap(long, env = "TAS_WORKER_ISO", help = "Path to the game iso")]
    pub iso: String,

    #[clap(
        long,
        env = "TAS_WORKER_SAVESTATE",
        help = "Path to the savestate loaded at boot"
    )]
    pub savestate: Option<String>,

    #[clap(
        long,
        env = "TAS_WORKER_QTBASE",
        help = "Emulator base directory (read-only, shared across workers)"
    )]
    pub qtbase: String,

    #[clap(
        long,
        env = "TAS_WORKER_USERDIR",
        help = "Per-worker user directory (exclusive to this worker)"
    )]
    pub userdir: String,

    #[clap(
        long,
        env = "TAS_WORKER_TIMEOUT_MS",
        default_value = "5000",
        help = "Default run-until-bp timeout in milliseconds"
    )]
    pub timeout: u32,
}
