//! Telemetry initialization

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize console logging at `info` unless `RUST_LOG` says otherwise.
///
/// ```
/// use forge_telemetry::init_telemetry;
/// init_telemetry("lesson-forge").expect("telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(service_name, "info")
}

/// Initialize console logging with `default_level` as the fallback filter.
///
/// Only the first call installs a subscriber; later calls are no-ops.
pub fn init_with_level(
    service_name: &str,
    default_level: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };

    let mut result: Result<(), Box<dyn std::error::Error>> = Ok(());
    INIT.call_once(|| {
        result = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| e.into());

        tracing::info!(service.name = service_name, "Telemetry initialized");
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_with_level("test", "debug").is_ok());
        assert!(init_telemetry("test").is_ok());
    }
}
