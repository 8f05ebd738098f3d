//! Logging initialization and shutdown.

use std::sync::OnceLock;

use opentelemetry::{
    global::{self, set_text_map_propagator},
    trace::TracerProvider,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime::Tokio,
    trace::{Config, TracerProvider as SdkTracerProvider},
};
use thiserror::Error;
use tracing::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::types::LoggerConfig;

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("otlp pipeline: {0}")]
    Otlp(String),

    #[error("subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Installs the global subscriber described by `config`.
///
/// Filtering defaults to `INFO` and can be overridden through `RUST_LOG`.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    set_text_map_propagator(TraceContextPropagator::new());

    let filt = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let stdout_layer = if config.stdout.json_format {
        layer()
            .json()
            .with_span_events(config.stdout.fmt_span.clone())
            .with_filter(filt.clone())
            .boxed()
    } else {
        layer()
            .compact()
            .with_span_events(config.stdout.fmt_span.clone())
            .with_filter(filt.clone())
            .boxed()
    };

    let file_layer = config.file.as_ref().map(|file| {
        let appender =
            RollingFileAppender::new(file.rotation.clone(), &file.directory, &file.file_name_prefix);
        if file.json_format {
            layer()
                .json()
                .with_writer(appender)
                .with_ansi(false)
                .with_filter(filt.clone())
                .boxed()
        } else {
            layer()
                .compact()
                .with_writer(appender)
                .with_ansi(false)
                .with_filter(filt.clone())
                .boxed()
        }
    });

    let otel_layer = match &config.otlp {
        Some(otlp) => {
            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(otlp.endpoint.clone())
                .with_timeout(otlp.timeout);

            let tp = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(Config::default().with_resource(config.build_resource()))
                .install_batch(Tokio)
                .map_err(|e| LoggingError::Otlp(e.to_string()))?;

            let tracer = tp.tracer("light-indexer");
            // Second init in one process keeps the first provider.
            let _ = TRACER_PROVIDER.set(tp);
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    info!(
        service_name = %config.service_name,
        service_version = ?config.service_version,
        otlp = config.otlp.is_some(),
        "logging initialized"
    );
    Ok(())
}

/// Flushes pending spans and tears down the tracer provider, if one was installed.
pub fn finalize() {
    info!("shutting down logging");

    match TRACER_PROVIDER.get() {
        Some(provider) => {
            if let Err(e) = provider.shutdown() {
                error!(?e, "failed to shut down tracer provider");
            }
        }
        None => debug!("no tracer provider to shut down"),
    }

    global::shutdown_tracer_provider();
}
