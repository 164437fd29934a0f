//! Debug switch for rust_op_registry
//!
//! Set OPREG_DEBUG=1 or OPREG_DEBUG=true to raise the default log level to
//! `debug`. An explicit RUST_LOG filter always wins.

use std::env;
use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if debug mode is enabled via OPREG_DEBUG environment variable
#[inline]
pub fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        env::var("OPREG_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "warn" }
}

/// Install the global `tracing` subscriber, writing to stderr.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug_enabled())));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::default_directive;

    #[test]
    fn debug_raises_default_level() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "warn");
    }
}
