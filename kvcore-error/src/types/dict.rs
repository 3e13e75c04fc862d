use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки хеш-таблицы `Dict`.
///
/// `KeyExists` и `KeyNotFound` — обычные отрицательные результаты, а не
/// исключительные ситуации. `FingerprintMismatch` означает, что во время
/// небезопасной итерации структура словаря была изменена: это нарушение
/// контракта, вызывающий код должен считать его фатальным.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictError {
    #[error("key already exists")]
    KeyExists,

    #[error("key not found")]
    KeyNotFound,

    #[error("rehash already in progress")]
    RehashInProgress,

    #[error("requested size {requested} is below the number of stored entries {used}")]
    SizeBelowUsed { requested: usize, used: usize },

    #[error("resizing is disabled")]
    ResizeDisabled,

    #[error("failed to allocate a table of {slots} slots")]
    AllocationFailed { slots: usize },

    #[error("dict mutated during unsafe iteration (fingerprint {expected:#x} != {actual:#x})")]
    FingerprintMismatch { expected: i64, actual: i64 },
}

pub type DictResult<T> = Result<T, DictError>;

impl ErrorExt for DictError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::KeyExists => StatusCode::AlreadyExists,
            Self::KeyNotFound => StatusCode::NotFound,
            Self::RehashInProgress => StatusCode::RehashInProgress,
            Self::SizeBelowUsed { .. } => StatusCode::InvalidArgs,
            Self::ResizeDisabled => StatusCode::ResizeForbidden,
            Self::AllocationFailed { .. } => StatusCode::OutOfMemory,
            Self::FingerprintMismatch { .. } => StatusCode::ContractViolation,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::FingerprintMismatch { .. } => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }
}
