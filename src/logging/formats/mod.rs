pub mod compact;
pub mod json;
pub mod pretty;

pub use compact::build_compact_layer;
pub use json::build_json_layer;
pub use pretty::build_pretty_layer;
