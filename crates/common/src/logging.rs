//! Logging setup: compact stdout output plus optional OpenTelemetry span export.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Environment variable holding the OTLP collector endpoint.
pub const OTLP_URL_ENVVAR: &str = "CAMPAIGN_OTLP_URL";

/// Environment variable holding a service label appended to the whoami string.
pub const SVC_LABEL_ENVVAR: &str = "CAMPAIGN_SVC_LABEL";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The OTLP exporter could not be built.
    #[error("could not build otlp exporter: {0}")]
    Exporter(String),

    /// A global subscriber was already installed.
    #[error("could not install subscriber: {0}")]
    Install(String),
}

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Identifies the service in logs and exported spans.
    whoami: String,

    /// Collector endpoint for exported spans.
    otel_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a new instance with whoami set and no span export.
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            otel_url: None,
        }
    }

    /// Creates a new instance named after `base`, plus the service label if one is set.
    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    /// Sets the opentelemetry URL.
    pub fn set_otlp_url(&mut self, url: String) {
        self.otel_url = Some(url);
    }

    /// Returns the whoami string.
    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(campaign)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Honours `RUST_LOG` for filtering, `LOG_FILE=1` and `LOG_LINE_NUM=1` for source locations.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filt = tracing_subscriber::EnvFilter::from_default_env();

    let log_file = env::var("LOG_FILE").is_ok_and(|v| v == "1");
    let log_line_num = env::var("LOG_LINE_NUM").is_ok_and(|v| v == "1");

    let stdout_sub = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(log_file)
                .with_line_number(log_line_num),
        )
        .with_filter(filt);

    if let Some(otel_url) = &config.otel_url {
        let resource = Resource::builder()
            .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
            .build();

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otel_url)
            .build()
            .map_err(|e| LoggingError::Exporter(e.to_string()))?;

        let tp = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build();

        let tracer = tp.tracer("campaign");
        let otel_sub = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(stdout_sub)
            .with(otel_sub)
            .try_init()
            .map_err(|e| LoggingError::Install(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(stdout_sub)
            .try_init()
            .map_err(|e| LoggingError::Install(e.to_string()))?;
    }

    info!(whoami = %config.whoami, "logging started");
    Ok(())
}

/// Gets the OTLP URL from [`OTLP_URL_ENVVAR`].
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok()
}

/// Gets the service label from [`SVC_LABEL_ENVVAR`].
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    match get_service_label_from_env() {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}
