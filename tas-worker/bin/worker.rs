use clap::Parser;
use dotenvy::dotenv;
use tas_emulator::fake::FakeEmulator;
use tas_worker::{config::WorkerConfig, lifecycle, logging};

/// The embedded emulator itself is an external collaborator outside this
/// workspace's scope; this binary drives the
/// same deterministic [`FakeEmulator`] the VM's own test suite uses so the
/// Worker Process lifecycle is exercisable end to end without it.
fn main() {
    logging::init();
    dotenv().ok();

    let cfg = WorkerConfig::parse();
    tracing::debug!(?cfg, "worker starting");

    let host = FakeEmulator::new();
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let code = lifecycle::run(&cfg, host, stdin.lock(), stdout.lock());

    std::process::exit(code);
}
