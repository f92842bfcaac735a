//! Log subscriber setup
//!
//! The runtime only emits `tracing` events; installing a subscriber is left
//! to the application. `init_logging` is a convenience for binaries and
//! tests that want the usual fmt output.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directive used when `RUST_LOG` is unset or unparsable
    pub default_directive: String,
    /// One JSON object per event instead of human-readable lines
    pub json: bool,
    pub thread_names: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            default_directive: "info".to_string(),
            json: false,
            thread_names: true,
        }
    }
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already set, which makes the
/// call safe to repeat from every test.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(config.thread_names)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let config = LogConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
        tracing::info!(session = 1, "logging installed");
    }
}
