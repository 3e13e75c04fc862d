pub mod settings;

// Publicly re-export all types from the submodules to simplify access from
// external code.
pub use settings::*;
