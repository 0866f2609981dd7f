//! Test logging, initialised once per test binary.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Quiet unless asked: `TEST_LOG`, then `RUST_LOG`, then `warn`.
///
/// Idempotent and race-safe; safe to call from every test and from a
/// `ctor` hook. Output goes through the test writer so cargo and nextest
/// capture it per test.
pub fn init() {
    init_with_default("warn");
}

/// Like [`init`] with a different fallback filter, e.g. `"gamehall=debug"`
/// while chasing a timer bug in one suite.
pub fn init_with_default(default_filter: &str) {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .with_target(true)
            .try_init()
            .ok();
    });
}
