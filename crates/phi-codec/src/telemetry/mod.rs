//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No PHI or key material** may appear in any log field or span attribute.
//!   Field names, key version ids, and error codes are the only values logged.
//! - Log level is configurable via `PHI_CODEC_LOG_LEVEL` (default: `info`).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// Outputs structured JSON logs to stdout at `log_level`; `RUST_LOG` takes
/// precedence when set. Integrating applications that install their own
/// subscriber should skip this.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise phi-codec tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        // The first call may lose to another test's subscriber; either way a
        // global subscriber is set afterwards.
        let _ = init("debug");
        assert!(init("info").is_err());
    }
}
