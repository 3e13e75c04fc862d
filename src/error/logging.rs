use std::{any::Any, io};

use kvcore_error::{ErrorExt, StatusCode};
use thiserror::Error;

/// Ошибки инициализации логирования.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("log file name must not be empty")]
    EmptyFileName,

    #[error("failed to prepare log directory: {0}")]
    Io(#[from] io::Error),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

impl ErrorExt for LoggingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLevel(_) | Self::EmptyFileName => StatusCode::InvalidConfig,
            Self::Io(_) => StatusCode::Io,
            Self::AlreadyInitialized(_) => StatusCode::Unexpected,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
