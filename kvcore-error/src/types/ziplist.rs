use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки компактного списка `ZipList`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZipListError {
    #[error("failed to allocate {bytes} bytes for the ziplist blob")]
    AllocationFailed { bytes: usize },

    #[error("ziplist blob of {bytes} bytes exceeds the 32-bit length field")]
    BlobTooLarge { bytes: usize },

    #[error("corrupted ziplist at offset {offset}: {reason}")]
    Corrupted { offset: usize, reason: String },
}

pub type ZipListResult<T> = Result<T, ZipListError>;

impl ErrorExt for ZipListError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AllocationFailed { .. } => StatusCode::OutOfMemory,
            Self::BlobTooLarge { .. } => StatusCode::SizeLimit,
            Self::Corrupted { .. } => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::Corrupted { .. } => "Corrupted data".to_string(),
            _ => self.to_string(),
        }
    }
}
