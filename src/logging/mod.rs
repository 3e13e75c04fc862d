pub mod config;
mod filters;
pub mod formats;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::Layered, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::error::LoggingError;

type BaseSubscriber = Layered<EnvFilter, Registry>;

/// Собирает подписчик по конфигурации, не устанавливая его глобально.
///
/// Возвращает guard файлового writer-а, если файловый вывод включён.
pub fn build_subscriber(
    config: &LoggingConfig
) -> (
    impl tracing::Subscriber + Send + Sync + 'static,
    Option<WorkerGuard>,
) {
    let env_filter = filters::build_filter_from_config(config);
    let mut layers: Vec<Box<dyn Layer<BaseSubscriber> + Send + Sync>> = Vec::new();

    // Console layer
    if config.console_enabled {
        layers.push(sinks::console::layer_with_config(config));
    }

    // File layer
    let file_guard = if config.file_enabled {
        let (file_layer, guard) = sinks::file::layer_with_config(config);
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers);

    (subscriber, file_guard)
}

/// Инициализация логирования с конфигурацией.
///
/// Устанавливает глобальный подписчик; повторный вызов в том же процессе
/// возвращает [`LoggingError::AlreadyInitialized`].
pub fn init_logging(mut config: LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.apply_env_overrides();
    config.validate()?;
    config.ensure_log_dir()?;

    let (subscriber, file_guard) = build_subscriber(&config);
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = ?config.format,
        log_dir = %config.log_dir.display(),
        console_enabled = config.console_enabled,
        file_enabled = config.file_enabled,
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
