use tracing_subscriber::{fmt::MakeWriter, layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::{LogFormat, LoggingConfig},
    formats,
};

/// Build formatter на основе конфигурации.
/// Возвращаем boxed trait-объект, чтобы стереть конкретный тип формата
/// (json/pretty/compact).
pub fn build_formatter_from_config<S, W>(
    config: &LoggingConfig,
    writer: W,
    with_ansi: bool,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => formats::build_json_layer(config, writer, with_ansi),
        LogFormat::Pretty => formats::build_pretty_layer(config, writer, with_ansi),
        LogFormat::Compact => formats::build_compact_layer(config, writer, with_ansi),
    }
}
