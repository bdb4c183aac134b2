//! Logging and tracing setup.
//!
//! Always installs a `tracing-subscriber` registry filtered by `RUST_LOG`
//! (default `info`):
//! - stderr, human-readable, or JSON lines when `RELAY_LOG_FORMAT=json`
//! - optionally an append-only plain-text log file (`--log-file`)
//!
//! With the `otel` feature and `OTEL_EXPORTER_OTLP_ENDPOINT` set, spans and
//! events are additionally exported over OTLP HTTP.
//!
//! ## Distributed tracing
//!
//! If `TRACEPARENT` is set (W3C Trace Context format), spans are created as
//! children of the remote parent. Poster commands receive the current
//! context through the same variable (see [`current_traceparent`]).

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Env var selecting the stderr log format (`json` or anything else).
pub const LOG_FORMAT_ENV: &str = "RELAY_LOG_FORMAT";

/// Opaque guard. Dropping it flushes and shuts down the OTLP pipeline.
/// Hold this in `main()` until exit.
pub struct TelemetryGuard {
    #[cfg(feature = "otel")]
    trace_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
    #[cfg(feature = "otel")]
    log_provider: Option<opentelemetry_sdk::logs::SdkLoggerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "otel")]
        {
            if let Some(provider) = self.trace_provider.take()
                && let Err(e) = provider.shutdown()
            {
                eprintln!("otel trace shutdown error: {e}");
            }
            if let Some(provider) = self.log_provider.take()
                && let Err(e) = provider.shutdown()
            {
                eprintln!("otel log shutdown error: {e}");
            }
        }
    }
}

/// Install the global subscriber.
///
/// Returns a guard that must be held until the program exits. Calling this
/// twice keeps the first subscriber.
#[must_use]
pub fn init(log_file: Option<&Path>) -> TelemetryGuard {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

    match endpoint.as_deref() {
        None | Some("") => init_local(log_file),
        #[cfg(feature = "otel")]
        Some(_) => init_otlp(log_file),
        #[cfg(not(feature = "otel"))]
        Some(_) => {
            eprintln!(
                "warning: OTEL_EXPORTER_OTLP_ENDPOINT set but meme-relay built without 'otel' feature"
            );
            init_local(log_file)
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn json_requested() -> bool {
    std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}

/// Stderr output plus the optional log file.
fn output_layers<S>(log_file: Option<&Path>) -> Vec<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let mut layers = Vec::new();

    if json_requested() {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_span_events(fmt::format::FmtSpan::CLOSE)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(io::stderr)
                .boxed(),
        );
    }

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => layers.push(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            ),
            Err(e) => eprintln!("warning: cannot open log file {}: {e}", path.display()),
        }
    }

    layers
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn init_local(log_file: Option<&Path>) -> TelemetryGuard {
    // Err only means a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(output_layers(log_file))
        .try_init();

    TelemetryGuard {
        #[cfg(feature = "otel")]
        trace_provider: None,
        #[cfg(feature = "otel")]
        log_provider: None,
    }
}

/// OTLP HTTP export (traces + logs) alongside the local outputs.
///
/// The SDK reads `OTEL_EXPORTER_OTLP_ENDPOINT` from the environment natively
/// and appends `/v1/traces` or `/v1/logs` as appropriate.
#[cfg(feature = "otel")]
fn init_otlp(log_file: Option<&Path>) -> TelemetryGuard {
    use opentelemetry::trace::TracerProvider as _;

    let span_exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!("warning: failed to init OTLP span exporter: {e}");
            return init_local(log_file);
        }
    };
    let log_exporter = match opentelemetry_otlp::LogExporter::builder()
        .with_http()
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!("warning: failed to init OTLP log exporter: {e}");
            return init_local(log_file);
        }
    };

    let resource = otel_resource();
    let trace_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_simple_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();
    let log_provider = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
        .with_simple_exporter(log_exporter)
        .with_resource(resource)
        .build();

    let tracer = trace_provider.tracer(env!("CARGO_PKG_NAME"));
    let trace_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let log_layer =
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&log_provider);

    install_parent_context();

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(trace_layer)
        .with(log_layer)
        .with(output_layers(log_file))
        .try_init();

    TelemetryGuard {
        trace_provider: Some(trace_provider),
        log_provider: Some(log_provider),
    }
}

/// The current span's trace context as a W3C `TRACEPARENT` string.
///
/// `None` if OTEL is not enabled or no valid span context exists.
#[cfg(feature = "otel")]
#[must_use]
pub fn current_traceparent() -> Option<String> {
    use opentelemetry::propagation::TextMapPropagator as _;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use std::collections::HashMap;
    use tracing_opentelemetry::OpenTelemetrySpanExt as _;

    let cx = tracing::Span::current().context();
    let mut carrier: HashMap<String, String> = HashMap::new();
    TraceContextPropagator::new().inject_context(&cx, &mut carrier);
    carrier.remove("traceparent")
}

/// Stub when otel feature is disabled.
#[cfg(not(feature = "otel"))]
#[must_use]
pub const fn current_traceparent() -> Option<String> {
    None
}

/// If `TRACEPARENT` is set, install it as the current `OTel` context so that
/// root spans become children of the remote parent.
#[cfg(feature = "otel")]
fn install_parent_context() {
    use opentelemetry::propagation::TextMapPropagator as _;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use std::collections::HashMap;

    if let Ok(traceparent) = std::env::var("TRACEPARENT") {
        let mut carrier: HashMap<String, String> = HashMap::new();
        carrier.insert("traceparent".to_owned(), traceparent);
        let cx = TraceContextPropagator::new().extract(&carrier);
        // Leaked on purpose: the parent stays attached for the whole process.
        std::mem::forget(cx.attach());
    }
}

#[cfg(feature = "otel")]
fn otel_resource() -> opentelemetry_sdk::Resource {
    use opentelemetry::KeyValue;
    opentelemetry_sdk::Resource::builder()
        .with_attribute(KeyValue::new("service.name", env!("CARGO_PKG_NAME")))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build()
}
