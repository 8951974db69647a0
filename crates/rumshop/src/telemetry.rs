//! Process logging. Not to be confused with the storefront telemetry in
//! `rumshop-telemetry`: this is how rumshop reports on itself.

use std::io::IsTerminal;
use std::sync::{Mutex, OnceLock};

use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace as sdktrace;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Whether the process exports its own `tracing` spans over OTLP/gRPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTrace {
    Off,
    On,
}

impl SelfTrace {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("RUMSHOP_SELF_TRACE").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Self::On,
            _ => Self::Off,
        }
    }
}

/// For short-lived subcommands.
pub fn init_cli_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

pub fn init_serve_tracing(self_trace: SelfTrace, service_name: &str) {
    let env_filter = EnvFilter::from_default_env();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .compact();

    let otlp_layer = match self_trace {
        SelfTrace::On => build_otlp_layer(service_name),
        SelfTrace::Off => None,
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otlp_layer)
        .try_init();
}

pub fn shutdown_tracing() {
    if let Some(provider) = otlp_provider_slot()
        .lock()
        .ok()
        .and_then(|mut slot| slot.take())
    {
        let _ = provider.shutdown();
    }
}

fn build_otlp_layer<S>(service_name: &str) -> Option<OpenTelemetryLayer<S, sdktrace::Tracer>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_err() {
        return None;
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_resource(
            Resource::builder()
                .with_service_name(format!("{service_name}-process"))
                .build(),
        )
        .with_batch_exporter(exporter)
        .build();
    let tracer = provider.tracer("rumshop");

    if let Ok(mut slot) = otlp_provider_slot().lock() {
        *slot = Some(provider);
    }

    Some(tracing_opentelemetry::layer().with_tracer(tracer))
}

fn otlp_provider_slot() -> &'static Mutex<Option<sdktrace::SdkTracerProvider>> {
    static SLOT: OnceLock<Mutex<Option<sdktrace::SdkTracerProvider>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}
