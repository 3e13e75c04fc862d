//! Ошибки `kvcore`: коды статуса, трейт `ErrorExt`, ошибки словаря и
//! компактного списка.

pub mod ext;
pub mod status_code;
pub mod types;

pub use ext::*;
pub use status_code::*;
pub use types::*;
