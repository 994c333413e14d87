//! Logging and OpenTelemetry export for the GLaDOS TTS server
//!
//! Logs always go to stdout through `tracing-subscriber`. Traces and
//! metrics are exported over OTLP only when an exporter is configured.

mod metadata;
pub mod metrics;

use std::time::Duration;

use glados_config::{
    TelemetryConfig,
    telemetry::exporters::{ExportProtocol, ExporterConfig},
};
use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    trace::{Sampler, SdkTracerProvider},
};

pub use metrics::SynthesisMetrics;

/// Default filter when neither the CLI nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Keeps exporters alive; flushes and shuts them down on drop
#[derive(Default)]
pub struct TelemetryGuard {
    meter_provider: Option<SdkMeterProvider>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // the subscriber may already be gone, so report on stderr
        if let Some(Err(e)) = self.meter_provider.take().map(|provider| provider.shutdown()) {
            eprintln!("glados: metrics shutdown failed: {e}");
        }
        if let Some(Err(e)) = self.tracer_provider.take().map(|provider| provider.shutdown()) {
            eprintln!("glados: tracing shutdown failed: {e}");
        }
    }
}

/// Pick the log filter: explicit override, then config, then the default
pub fn log_filter<'a>(cli: Option<&'a str>, config: Option<&'a TelemetryConfig>) -> &'a str {
    cli.or_else(|| config.and_then(|c| c.log_filter.as_deref()))
        .unwrap_or(DEFAULT_LOG_FILTER)
}

/// Install the global subscriber
///
/// Logs go to stdout. When the configuration names an OTLP exporter, spans
/// and metrics are exported as well. Hold the returned guard until exit.
///
/// # Errors
///
/// Returns an error if an OTLP exporter cannot be built
pub fn init(config: Option<&TelemetryConfig>, filter: &str) -> anyhow::Result<TelemetryGuard> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let mut guard = TelemetryGuard::default();
    let mut otel_layer = None;

    if let Some(config) = config {
        let resource = metadata::build_resource(config);

        if let Some(exporter) = metrics_exporter(config) {
            let provider = meter_provider(exporter, resource.clone())?;
            global::set_meter_provider(provider.clone());
            guard.meter_provider = Some(provider);
        }

        if let Some(exporter) = tracing_exporter(config) {
            let rate = config.tracing.as_ref().map_or(1.0, |t| t.sampling_rate);
            let provider = tracer_provider(exporter, sampler(rate), resource)?;
            otel_layer = Some(tracing_opentelemetry::layer().with_tracer(provider.tracer("glados")));
            global::set_tracer_provider(provider.clone());
            guard.tracer_provider = Some(provider);
        }
    }

    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(otel_layer)
        .init();

    Ok(guard)
}

fn metrics_exporter(config: &TelemetryConfig) -> Option<&ExporterConfig> {
    config
        .metrics
        .as_ref()
        .and_then(|m| m.exporter.as_ref())
        .or(config.exporter.as_ref())
}

fn tracing_exporter(config: &TelemetryConfig) -> Option<&ExporterConfig> {
    config
        .tracing
        .as_ref()
        .and_then(|t| t.exporter.as_ref())
        .or(config.exporter.as_ref())
}

fn sampler(rate: f64) -> Sampler {
    let root = match rate {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::TraceIdRatioBased(r),
    };

    Sampler::ParentBased(Box::new(root))
}

fn meter_provider(config: &ExporterConfig, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let builder = MetricExporter::builder();
    let exporter = match config.protocol {
        ExportProtocol::Grpc => builder.with_tonic().with_endpoint(config.endpoint.as_str()).build(),
        ExportProtocol::HttpProto => builder.with_http().with_endpoint(config.endpoint.as_str()).build(),
    }
    .map_err(|e| anyhow::anyhow!("failed to build {:?} metrics exporter for {}: {e}", config.protocol, config.endpoint))?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(config.export_interval))
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

fn tracer_provider(config: &ExporterConfig, sampler: Sampler, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let builder = SpanExporter::builder();
    let exporter = match config.protocol {
        ExportProtocol::Grpc => builder.with_tonic().with_endpoint(config.endpoint.as_str()).build(),
        ExportProtocol::HttpProto => builder.with_http().with_endpoint(config.endpoint.as_str()).build(),
    }
    .map_err(|e| anyhow::anyhow!("failed to build {:?} span exporter for {}: {e}", config.protocol, config.endpoint))?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(sampler)
        .with_batch_exporter(exporter)
        .build())
}
