use std::fmt;

use crate::{Scope, ShaperError};

/// Bits reserved for the id part of a raw handle. The scope lives in the
/// remaining high bits.
const ID_BITS: u32 = 26;
const ID_MASK: u32 = (1 << ID_BITS) - 1;

/// Reserved id marking a detached handle whose id has not been allocated
/// yet. Only meaningful in the raw wire form; the typed API expresses an
/// unallocated id as `None`.
pub const ID_UNSPEC: u32 = ID_MASK;

/// Unique identity of a shaper node on a device: a `(scope, id)` pair.
///
/// `Port` and `Netdev` are singleton scopes with the implicit id 0. The
/// derived ordering is (scope nesting depth, scope, id), which is what
/// sorted dumps use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    scope: Scope,
    id: u32,
}

impl Handle {
    /// The port singleton handle.
    pub const fn port() -> Self {
        Self { scope: Scope::Port, id: 0 }
    }

    /// The netdev singleton handle.
    pub const fn netdev() -> Self {
        Self { scope: Scope::Netdev, id: 0 }
    }

    /// A queue-scope handle. The id is the queue number.
    pub const fn queue(id: u32) -> Self {
        Self { scope: Scope::Queue, id }
    }

    /// A detached-scope handle. Detached ids are allocated by the manager;
    /// this constructor names an already-allocated one.
    pub const fn detached(id: u32) -> Self {
        Self { scope: Scope::Detached, id }
    }

    /// Creates a handle from its parts, validating the scope/id
    /// combination.
    pub fn new(scope: Scope, id: u32) -> Result<Self, ShaperError> {
        if scope.is_singleton() && id != 0 {
            return Err(ShaperError::Invalid(format!(
                "scope {scope} is a singleton, id must be 0, got {id}"
            )));
        }
        if id > ID_MASK {
            return Err(ShaperError::Invalid(format!("id {id} out of range for scope {scope}")));
        }
        Ok(Self { scope, id })
    }

    /// Returns the scope of this handle.
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the id of this handle.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Packs the handle into its raw `u32` wire form.
    pub const fn to_raw(self) -> u32 {
        let scope = match self.scope {
            Scope::Port => 1u32,
            Scope::Netdev => 2,
            Scope::Queue => 3,
            Scope::Detached => 4,
        };
        (scope << ID_BITS) | self.id
    }

    /// Unpacks a handle from its raw `u32` wire form.
    pub fn from_raw(raw: u32) -> Result<Self, ShaperError> {
        let scope = match raw >> ID_BITS {
            1 => Scope::Port,
            2 => Scope::Netdev,
            3 => Scope::Queue,
            4 => Scope::Detached,
            other => {
                return Err(ShaperError::Invalid(format!("unknown scope code {other} in handle")))
            }
        };
        Self::new(scope, raw & ID_MASK)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}
