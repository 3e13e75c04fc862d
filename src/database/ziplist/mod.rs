pub mod encoding;
pub mod entry;
pub mod ziplist_base;

// Publicly re-export all types and functions from the submodules to
// simplify access from external code.
pub use encoding::{Encoding, HEADER_SIZE, ZIP_END};
pub use entry::*;
pub use ziplist_base::*;
