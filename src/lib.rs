/// Loading settings from defaults, files and the environment.
pub mod config;
/// Core data structures: incrementally rehashed Dict and compact ZipList.
pub mod database;
/// Library-level error types and the shared status-code taxonomy.
pub mod error;
/// Structured logging (formats, filters, console and file sinks).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Settings for tables and logging.
pub use config::{DictSettings, Settings};
/// Hash table, its type descriptors, iterators and resize policy.
pub use database::dict::{
    gen_case_hash, gen_hash, identity_hash, int_hash, BytesDictType, CaseInsensitiveDictType,
    Dict, DictEntry, DictIter, DictIterator, DictType, EntryKey, EntryValue, HasherDictType,
    IntDictType, ResizePolicy,
};
/// Compact sequence and its value types.
pub use database::ziplist::{Where, ZipList, ZipListIter, ZipValue, ZipValueOwned, ZlEntry};
/// Error types.
pub use error::{
    DictError, DictResult, ErrorExt, KvError, KvResult, LoggingError, StatusCode, ZipListError,
    ZipListResult,
};
/// Logging initialization.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
