use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{config::LoggingConfig, formatter};

/// File layer с ежедневной ротацией и неблокирующей записью.
///
/// Guard должен жить, пока нужен вывод: при его drop буфер сбрасывается
/// на диск.
pub fn layer_with_config<S>(
    config: &LoggingConfig
) -> (Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let file_appender = rolling::daily(&config.log_dir, &config.file_name);
    let (writer, guard) = non_blocking(file_appender);

    // В файле управляющие последовательности не нужны.
    let layer = formatter::build_formatter_from_config(config, writer, false);

    (layer, guard)
}
