//! Per-device hierarchical shaper management: the authoritative node tree,
//! the validation and mutation engine, and the device backend seam.

mod device;
mod manager;
mod registry;
mod store;

pub use device::{ShaperDevice, SoftDevice};
pub use manager::{GroupInput, GroupOutput};
pub use registry::ShaperRegistry;
