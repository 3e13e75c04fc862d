use tracing_subscriber::{fmt, layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::config::LoggingConfig;

/// Создаёт JSON formatter layer: один объект на строку.
pub fn build_json_layer<S, W>(
    config: &LoggingConfig,
    writer: W,
    _with_ansi: bool,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let json_fmt = fmt::format().json().with_current_span(true).with_span_list(false);

    // ANSI в JSON ломает разбор строк.
    let layer = fmt::layer()
        .event_format(json_fmt)
        .fmt_fields(fmt::format::JsonFields::new())
        .with_writer(writer)
        .with_ansi(false)
        .with_target(config.with_target)
        .with_thread_names(true)
        .with_line_number(true);

    Box::new(layer)
}
