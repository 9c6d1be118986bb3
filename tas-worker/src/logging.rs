//! Tracing setup for the worker binary. Mirrors the donor's `setup_logger` shape: an
//! `EnvFilter` driven by `RUST_LOG`, initialized at most once.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
.with_env_filter(env_filter)
.with_writer(std::io::stderr)
.compact()
.init();
    });
}
