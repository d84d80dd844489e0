//! Core types for the shaper control plane: scopes, handles, node records,
//! capability flags and the error taxonomy.

use std::fmt;

mod caps;
mod error;
mod handle;
mod node;
mod scope;

pub use caps::Capabilities;
pub use error::{Result, ShaperError};
pub use handle::{Handle, ID_UNSPEC};
pub use node::{Metric, ShaperNode, ShaperSpec};
pub use scope::Scope;

/// Opaque identifier of a network device, the interface index on Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Creates a device id from its raw value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub const fn id(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DeviceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
