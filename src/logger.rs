pub use tracing::{debug, error, info, instrument, trace, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
};

fn filter_from_env() -> (EnvFilter, bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let is_debug = env_filter.to_string().contains("debug")
        || std::env::var("RUST_LOG").unwrap_or_default().contains("debug");
    (env_filter, is_debug)
}

/// Installs the global subscriber. Verbosity comes from `RUST_LOG` (default `info`);
/// at debug level span close events carry each stage's duration.
pub fn init() {
    let (env_filter, is_debug) = filter_from_env();

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(if is_debug { FmtSpan::CLOSE } else { FmtSpan::NONE });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Like [`init`] but safe to call from every test; output goes through the test writer.
pub fn init_for_tests() {
    let (env_filter, _) = filter_from_env();

    let fmt_layer = fmt::layer().with_target(false).with_test_writer();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
