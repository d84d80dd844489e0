use std::fmt;

use crate::Handle;

/// The structural level a shaper node is attached to.
///
/// Scopes nest in a fixed order: a [`Scope::Port`] shaper caps the whole
/// physical port, a [`Scope::Netdev`] shaper the network device on it, and
/// [`Scope::Queue`] / [`Scope::Detached`] shapers sit below the netdev, or
/// below another detached node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// The root shaper for the whole physical port.
    Port,
    /// The main shaper for the network device.
    Netdev,
    /// A shaper attached to a single device queue.
    Queue,
    /// An aggregation shaper not tied to a physical queue. Created by
    /// `group` operations and removed implicitly when its last child goes
    /// away.
    Detached,
}

impl Scope {
    /// Every scope, in nesting order.
    pub const ALL: [Self; 4] = [Self::Port, Self::Netdev, Self::Queue, Self::Detached];

    /// Returns the structural nesting depth of this scope. `Queue` and
    /// `Detached` are siblings at the same depth.
    pub const fn depth(&self) -> u32 {
        match self {
            Self::Port => 0,
            Self::Netdev => 1,
            Self::Queue | Self::Detached => 2,
        }
    }

    /// Returns `true` for the singleton scopes, whose only valid id is 0.
    pub const fn is_singleton(&self) -> bool {
        matches!(self, Self::Port | Self::Netdev)
    }

    /// Returns the parent handle implied by the nesting order for a node of
    /// this scope. `None` for the port root.
    pub const fn default_parent(&self) -> Option<Handle> {
        match self {
            Self::Port => None,
            Self::Netdev => Some(Handle::port()),
            Self::Queue | Self::Detached => Some(Handle::netdev()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Port => "port",
            Self::Netdev => "netdev",
            Self::Queue => "queue",
            Self::Detached => "detached",
        };
        f.write_str(name)
    }
}
