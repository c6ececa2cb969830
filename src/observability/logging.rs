//! Structured logging bootstrap.
//!
//! The library only emits `tracing` events and never installs a subscriber;
//! binaries call [`init_logging`] once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"secure_socket=debug"`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Directive enabling `level` for this crate and `warn` for everything else.
pub fn default_directive(level: &str) -> String {
    format!("warn,secure_socket={}", level.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_level_to_crate() {
        assert_eq!(default_directive("DEBUG"), "warn,secure_socket=debug");
    }

    #[test]
    fn second_install_is_refused() {
        init_logging("warn");
        assert!(!init_logging("warn"));
    }
}
