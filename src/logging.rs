//! Logging setup for applications embedding the settings store

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` (e.g. "info",
/// "whisperflow_settings=debug") is used. Fails if a global subscriber is
/// already set.
pub fn init_logging(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_gracefully() {
        // Another test may already have installed a subscriber, so only the
        // second call's outcome is deterministic
        let _ = init_logging("debug");
        assert!(init_logging("debug").is_err());
    }
}
