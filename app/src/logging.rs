use crate::config::CONFIG;
use opentelemetry::trace::TracerProvider as _;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. With `TRACE_STDOUT` set, spans are
/// additionally exported through opentelemetry to stdout.
pub fn init() {
    let level = CONFIG.log_level().parse::<Level>().unwrap_or(Level::INFO);

    let telemetry = if CONFIG.trace_stdout() {
        let provider = opentelemetry_sdk::trace::TracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("irrigo");
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(tracing_subscriber::fmt::layer().with_target(!cfg!(test)))
        .with(telemetry)
        .init();
}

/// Flushes pending spans of the opentelemetry exporter.
pub fn shutdown() {
    if CONFIG.trace_stdout() {
        opentelemetry::global::shutdown_tracer_provider();
    }
}
