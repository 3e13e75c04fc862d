pub mod dict_base;
pub mod dict_type;
pub mod entry;
pub mod iter;
pub mod policy;
pub mod scan;

// Publicly re-export all types and functions from the submodules to
// simplify access from external code.
pub use dict_base::*;
pub use dict_type::*;
pub use entry::*;
pub use iter::*;
pub use policy::*;
