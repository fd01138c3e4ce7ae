use crate::config::Config;
use common::TelemetryGuard;

/// Installs logging, with OTLP export when an endpoint is configured.
///
/// Keep the returned guard alive for the lifetime of the process.
pub fn setup_logging(config: &Config) -> anyhow::Result<Option<TelemetryGuard>> {
    match &config.otel_endpoint {
        Some(endpoint) => {
            let guard = TelemetryGuard::init(
                "gateway",
                endpoint,
                config.log_level.as_str(),
                config.environment,
            )?;
            Ok(Some(guard))
        }
        None => {
            common::setup_logging(config.log_level.as_str(), config.environment);
            Ok(None)
        }
    }
}
