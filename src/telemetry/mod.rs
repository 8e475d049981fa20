//! Tracing and OpenTelemetry initialization.
//!
//! Sets up tracing-subscriber with an env filter. If an OTLP endpoint is
//! configured, job spans, metrics, and logs are exported there as well;
//! otherwise output stays on stderr.

pub mod job;
pub mod metrics;

use crate::error::{Error, Result};

/// Configuration for telemetry initialization.
pub struct TelemetryConfig {
    /// Optional OTLP endpoint (e.g. "http://localhost:4317").
    /// When `None`, telemetry uses a simple fmt layer for local dev.
    pub endpoint: Option<String>,
    /// The service name reported in telemetry signals.
    pub service_name: String,
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            service_name: "jobpool".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// OTLP providers, present only when an endpoint is configured.
struct OtlpProviders {
    tracer: opentelemetry_sdk::trace::SdkTracerProvider,
    meter: opentelemetry_sdk::metrics::SdkMeterProvider,
    logger: opentelemetry_sdk::logs::SdkLoggerProvider,
}

/// Guard that shuts down OTel providers on drop.
///
/// Must be held for the lifetime of the application. Dropping it flushes
/// any pending spans, metrics, and logs.
pub struct TelemetryGuard {
    otlp: Option<OtlpProviders>,
}

impl TelemetryGuard {
    /// Whether signals are being exported over OTLP.
    pub fn is_exporting(&self) -> bool {
        self.otlp.is_some()
    }

    /// Force-flush all telemetry pipelines.
    pub fn force_flush(&self) {
        if let Some(ref otlp) = self.otlp {
            let _ = otlp.tracer.force_flush();
            let _ = otlp.meter.force_flush();
            let _ = otlp.logger.force_flush();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // Logs first so shutdown messages from the other providers are not lost.
        if let Some(otlp) = self.otlp.take() {
            let _ = otlp.logger.shutdown();
            let _ = otlp.meter.shutdown();
            let _ = otlp.tracer.shutdown();
        }
    }
}

/// Initialize tracing, and OTLP export when an endpoint is configured.
///
/// # Errors
///
/// Returns an error if an OTLP exporter fails to build or the tracing
/// subscriber cannot be installed (e.g. one was already set).
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .compact();

    let Some(endpoint) = config.endpoint else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;
        return Ok(TelemetryGuard { otlp: None });
    };

    let otlp = build_otlp(&endpoint, config.service_name)?;
    opentelemetry::global::set_meter_provider(otlp.meter.clone());

    let trace_layer = tracing_opentelemetry::layer().with_tracer(otlp.tracer.tracer("jobpool"));
    let log_layer =
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&otlp.logger);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(trace_layer)
        .with(log_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;

    Ok(TelemetryGuard { otlp: Some(otlp) })
}

fn build_otlp(endpoint: &str, service_name: String) -> Result<OtlpProviders> {
    use opentelemetry_otlp::WithExportConfig as _;

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .build();

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_error("span", e))?;
    let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_error("metric", e))?;
    let meter = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .with_resource(resource.clone())
        .build();

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_error("log", e))?;
    let logger = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    Ok(OtlpProviders {
        tracer,
        meter,
        logger,
    })
}

fn exporter_error(signal: &str, e: impl std::fmt::Display) -> Error {
    Error::Other(format!("failed to create OTLP {signal} exporter: {e}"))
}
