use std::{any::Any, io};

use kvcore_error::{DictError, ErrorExt, StatusCode, ZipListError};
use thiserror::Error;

use super::LoggingError;

pub type KvResult<T> = Result<T, KvError>;

/// Общая ошибка библиотеки: объединяет ошибки структур данных и окружения.
#[derive(Error, Debug)]
pub enum KvError {
    // ==== Структуры данных ====
    #[error("dict error: {0}")]
    Dict(#[from] DictError),

    #[error("ziplist error: {0}")]
    ZipList(#[from] ZipListError),

    // ==== Окружение ====
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ErrorExt for KvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Dict(e) => e.status_code(),
            Self::ZipList(e) => e.status_code(),
            Self::Config(_) => StatusCode::InvalidConfig,
            Self::Logging(e) => e.status_code(),
            Self::Io(_) => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что код статуса берётся из вложенной ошибки.
    #[test]
    fn test_status_code_is_delegated() {
        let err = KvError::from(DictError::KeyExists);
        assert_eq!(err.status_code(), StatusCode::AlreadyExists);

        let err = KvError::from(ZipListError::BlobTooLarge { bytes: 1 << 33 });
        assert_eq!(err.status_code(), ZipListError::BlobTooLarge { bytes: 1 << 33 }.status_code());

        let err = KvError::from(config::ConfigError::Message("bad".into()));
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }

    /// Тест проверяет приведение `dyn ErrorExt` обратно к `KvError`.
    #[test]
    fn test_downcast_through_error_ext() {
        let err: Box<dyn ErrorExt> = Box::new(KvError::from(DictError::KeyNotFound));
        assert_eq!(err.status_code(), StatusCode::NotFound);
        assert!(matches!(
            err.as_any().downcast_ref::<KvError>(),
            Some(KvError::Dict(DictError::KeyNotFound))
        ));
    }
}
