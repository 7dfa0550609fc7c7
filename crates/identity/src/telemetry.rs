use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use std::sync::OnceLock;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Keep the LoggerProvider alive for the process lifetime.
static LOGGER_PROVIDER: OnceLock<opentelemetry_sdk::logs::SdkLoggerProvider> = OnceLock::new();

/// Tokio runtime for the OTLP gRPC exporters. Tonic's `connect_lazy()`
/// calls `tokio::spawn`, so a runtime context must exist when the exporters
/// are built, even if the embedding application has not entered one yet.
static OTEL_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Exporter settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Collector gRPC address, e.g. `http://localhost:4317`.
    pub endpoint: String,
    pub service_name: String,
    pub environment: String,
    /// SigNoz Cloud access token, sent as gRPC metadata when present.
    pub ingestion_key: Option<String>,
}

impl TelemetrySettings {
    /// `None` when `OTEL_EXPORTER_OTLP_ENDPOINT` is unset.
    pub fn from_env() -> Option<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty())?;
        Some(Self {
            endpoint,
            service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "resident-identity".to_string()),
            environment: lookup("DEPLOY_ENV").unwrap_or_else(|| "development".to_string()),
            ingestion_key: lookup("SIGNOZ_INGESTION_KEY").filter(|k| !k.is_empty()),
        })
    }

    fn uses_tls(&self) -> bool {
        self.endpoint.starts_with("https://")
    }

    fn metadata(&self) -> Option<opentelemetry_otlp::tonic_types::metadata::MetadataMap> {
        let key = self.ingestion_key.as_deref()?;
        let value = match key.parse() {
            Ok(value) => value,
            Err(e) => {
                eprintln!("Ignoring invalid SIGNOZ_INGESTION_KEY: {e}");
                return None;
            }
        };
        let mut metadata = opentelemetry_otlp::tonic_types::metadata::MetadataMap::new();
        metadata.insert("signoz-ingestion-key", value);
        Some(metadata)
    }
}

/// Set up OTLP export for traces and for the `log` crate.
///
/// Returns false when telemetry is not configured or an exporter could not
/// be built. The embedding application owns the `tracing` subscriber.
pub fn init_telemetry() -> bool {
    match TelemetrySettings::from_env() {
        Some(settings) => init_with(&settings),
        None => {
            eprintln!("OTEL_EXPORTER_OTLP_ENDPOINT not set, skipping OTLP telemetry");
            false
        }
    }
}

fn otel_runtime() -> Option<&'static tokio::runtime::Runtime> {
    if let Some(rt) = OTEL_RUNTIME.get() {
        return Some(rt);
    }
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .build()
    {
        Ok(rt) => {
            let _ = OTEL_RUNTIME.set(rt);
            OTEL_RUNTIME.get()
        }
        Err(e) => {
            eprintln!("Failed to create OTEL runtime: {e}");
            None
        }
    }
}

pub fn init_with(settings: &TelemetrySettings) -> bool {
    let Some(rt) = otel_runtime() else {
        return false;
    };
    let _guard = rt.enter();

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint);
    if settings.uses_tls() {
        builder = builder.with_tls_config(
            opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots(),
        );
    }
    if let Some(metadata) = settings.metadata() {
        builder = builder.with_metadata(metadata);
    }
    let exporter = match builder.build() {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e}");
            return false;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(settings.service_name.clone())
        .with_attribute(KeyValue::new("service.version", APP_VERSION))
        .with_attribute(KeyValue::new(
            "deployment.environment",
            settings.environment.clone(),
        ))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(provider);

    // -- Log exporter (uses the `log` crate, not the `tracing` subscriber) --
    let mut log_builder = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint);
    if settings.uses_tls() {
        log_builder = log_builder.with_tls_config(
            opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots(),
        );
    }
    if let Some(metadata) = settings.metadata() {
        log_builder = log_builder.with_metadata(metadata);
    }
    let log_exporter = match log_builder.build() {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to create OTLP log exporter: {e}");
            return false;
        }
    };

    let logger_provider = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();
    let logger_provider = LOGGER_PROVIDER.get_or_init(|| logger_provider);

    let bridge = opentelemetry_appender_log::OpenTelemetryLogBridge::new(logger_provider);
    match log::set_boxed_logger(Box::new(bridge)) {
        Ok(()) => log::set_max_level(log::LevelFilter::Info),
        Err(_) => eprintln!("Log bridge skipped: a log crate logger is already set"),
    }

    log::info!(
        "Telemetry initialized v{APP_VERSION} for {} ({})",
        settings.service_name,
        settings.environment
    );
    true
}
