pub mod global;
pub mod logging;

pub use global::{KvError, KvResult};
pub use logging::LoggingError;

// Publicly re-export the error taxonomy of the companion crate to simplify
// access from external code.
pub use kvcore_error::{DictError, DictResult, ErrorExt, StatusCode, ZipListError, ZipListResult};
