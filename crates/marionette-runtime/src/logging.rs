//! Logging setup for hosts and tools.
//!
//! Library crates only emit `tracing` events; installing a subscriber is
//! left to the binary.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use marionette_core::{AnimError, AnimResult};

/// Subscriber settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "marionette=info".into(),
            json: false,
            with_target: true,
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> AnimResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| AnimError::InvalidConfig(format!("log filter: {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| AnimError::InvalidConfig(format!("log subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        // Another test binary thread may have installed one first
        let _ = init_logging(&config);
        assert!(matches!(init_logging(&config), Err(AnimError::InvalidConfig(_))));
    }
}
