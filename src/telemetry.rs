//! Logging and metrics exporter setup.
//!
//! - `tracing` subscriber with an `EnvFilter` (`RUST_LOG` wins over config)
//! - text or JSON log lines
//! - Prometheus scrape endpoint (`prometheus` feature)
//! - OTLP span export (`otel` feature)

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, TelemetryConfig};

#[cfg(feature = "otel")]
static TRACER_PROVIDER: std::sync::OnceLock<opentelemetry_sdk::trace::SdkTracerProvider> =
    std::sync::OnceLock::new();

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type BoxLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber and, if configured, the metrics exporter.
pub fn init(config: &TelemetryConfig) -> Result<(), BoxError> {
    let filter = env_filter(&config.log_level)?;

    #[cfg_attr(not(feature = "otel"), allow(unused_mut))]
    let mut layers: Vec<BoxLayer> = vec![fmt_layer(config.log_format)];

    #[cfg(feature = "otel")]
    if let Some(ref otel) = config.opentelemetry {
        layers.push(otel_layer(otel)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    #[cfg(feature = "otel")]
    if let Some(ref otel) = config.opentelemetry {
        tracing::info!(endpoint = %otel.endpoint, "OpenTelemetry tracing enabled");
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = config.prometheus_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "Prometheus metrics exporter started");
    }

    Ok(())
}

/// Filter from `RUST_LOG`, falling back to the configured directive.
fn env_filter(log_level: &str) -> Result<EnvFilter, BoxError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(log_level)?),
    }
}

fn fmt_layer(format: LogFormat) -> BoxLayer {
    match format {
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .boxed(),
    }
}

#[cfg(feature = "otel")]
fn otel_layer(otel: &crate::config::OpenTelemetryConfig) -> Result<BoxLayer, BoxError> {
    use opentelemetry::trace::TracerProvider;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use opentelemetry_sdk::Resource;
    use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otel.endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, otel.service_name.clone()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();
    let tracer = provider.tracer("fleet-dns");

    // Kept for flushing on shutdown
    let _ = TRACER_PROVIDER.set(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}

/// Flush exporters before exit.
pub fn shutdown() {
    #[cfg(feature = "otel")]
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            tracing::warn!("Error shutting down tracer provider: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        assert!(EnvFilter::try_new("fleet_dns=debug,warn").is_ok());
    }

    #[test]
    fn test_env_filter_rejects_garbage() {
        assert!(EnvFilter::try_new("fleet_dns=loud").is_err());
    }
}
