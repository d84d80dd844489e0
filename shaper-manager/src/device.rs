use rustc_hash::FxHashMap;

use shaper_core::{Capabilities, Handle, Result, Scope, ShaperNode};

/// Device-side operations backing the shaper control plane.
///
/// This is the seam between the control plane and whatever actually
/// enforces the configured limits: NIC firmware, a driver, or a software
/// pacer. The engine validates every request before invoking an `apply_*`
/// hook and commits to its tree only after the hook succeeds, so a backend
/// never observes a half-applied configuration.
pub trait ShaperDevice: Send + Sync + 'static {
    /// Returns the capability set for the given scope, or `None` when the
    /// device has no shaper support at all for that scope.
    ///
    /// `Some(Capabilities::NONE)` is a valid answer and distinct from
    /// `None`: the scope is supported but no optional feature is.
    fn capabilities(&self, scope: Scope) -> Option<Capabilities>;

    /// Applies a validated create-or-update of a single node.
    fn apply_set(&self, shaper: &ShaperNode) -> Result<()>;

    /// Removes the node's configuration, restoring default behavior.
    fn apply_delete(&self, handle: Handle) -> Result<()>;

    /// Nests the input shapers under the output shaper, creating either
    /// side as needed.
    fn apply_group(&self, inputs: &[ShaperNode], output: &ShaperNode) -> Result<()>;
}

/// A software-only backend that accepts every validated change.
///
/// Useful for devices that enforce shaping in software, where recording the
/// configuration is all that is needed, and as a stand-in during tests.
#[derive(Debug, Clone, Default)]
pub struct SoftDevice {
    caps: FxHashMap<Scope, Capabilities>,
}

impl SoftDevice {
    /// Creates a backend with no shaper support on any scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises the given capability set for a scope.
    pub fn with_scope(mut self, scope: Scope, caps: Capabilities) -> Self {
        self.caps.insert(scope, caps);
        self
    }

    /// Creates a backend advertising every capability on every scope.
    pub fn permissive() -> Self {
        let mut dev = Self::new();
        for scope in Scope::ALL {
            dev = dev.with_scope(scope, Capabilities::all());
        }
        dev
    }
}

impl ShaperDevice for SoftDevice {
    fn capabilities(&self, scope: Scope) -> Option<Capabilities> {
        self.caps.get(&scope).copied()
    }

    fn apply_set(&self, _shaper: &ShaperNode) -> Result<()> {
        Ok(())
    }

    fn apply_delete(&self, _handle: Handle) -> Result<()> {
        Ok(())
    }

    fn apply_group(&self, _inputs: &[ShaperNode], _output: &ShaperNode) -> Result<()> {
        Ok(())
    }
}
