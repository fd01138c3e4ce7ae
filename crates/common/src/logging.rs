use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Subscriber stack that the OpenTelemetry layer is attached to.
pub(crate) type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// `RUST_LOG` takes precedence over `default_level` when it is set.
///
/// An OpenTelemetry layer is always attached; it only exports spans once a
/// global tracer provider exists (see [`crate::TelemetryGuard`]).
pub fn setup_logging(default_level: &str, environment: Environment) {
    init_subscriber(default_level, environment, tracing_opentelemetry::layer());
}

pub(crate) fn init_subscriber<L>(default_level: &str, environment: Environment, otel_layer: L)
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
