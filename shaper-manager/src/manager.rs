use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use shaper_core::{
    Capabilities, Handle, Metric, Result, Scope, ShaperError, ShaperNode, ShaperSpec,
};

use crate::{device::ShaperDevice, store::ShaperStore};

/// One input to a `group` operation: a queue node (created on the fly if
/// needed) or an existing detached node, plus the attributes to merge into
/// it, usually just the scheduling weight.
#[derive(Debug, Clone, Copy)]
pub struct GroupInput {
    /// Node to nest under the group output.
    pub handle: Handle,
    /// Attributes merged into the input node.
    pub spec: ShaperSpec,
}

impl GroupInput {
    /// Creates a group input.
    pub const fn new(handle: Handle, spec: ShaperSpec) -> Self {
        Self { handle, spec }
    }
}

/// The aggregation output of a `group` operation.
#[derive(Debug, Clone, Copy)]
pub struct GroupOutput {
    /// Scope of the output node, `Detached` or `Netdev`.
    pub scope: Scope,
    /// Explicit id of an existing detached output. `None` asks the manager
    /// to allocate a fresh detached node.
    pub id: Option<u32>,
    /// Optional explicit parent for the output: the netdev singleton or an
    /// existing detached node.
    pub parent: Option<Handle>,
    /// Rate attributes applied to the output node.
    pub spec: ShaperSpec,
}

impl GroupOutput {
    /// A new detached output with a manager-allocated id.
    pub fn detached() -> Self {
        Self { scope: Scope::Detached, id: None, parent: None, spec: ShaperSpec::new() }
    }

    /// An existing detached output.
    pub fn detached_id(id: u32) -> Self {
        Self { id: Some(id), ..Self::detached() }
    }

    /// The netdev singleton as the group output.
    pub fn netdev() -> Self {
        Self { scope: Scope::Netdev, id: None, parent: None, spec: ShaperSpec::new() }
    }

    /// Sets the attributes applied to the output node.
    pub fn with_spec(mut self, spec: ShaperSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Sets an explicit parent for the output node.
    pub fn with_parent(mut self, parent: Handle) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Per-device shaper state: the backend handle plus the node tree.
///
/// Mutations serialize on the store's write lock, which makes multi-node
/// sequences (`group`, cascading `delete`) atomic with respect to other
/// operations on the same device. `get` and `dump` take read locks and
/// observe consistent snapshots.
pub(crate) struct DeviceShapers {
    backend: Arc<dyn ShaperDevice>,
    store: RwLock<ShaperStore>,
}

impl DeviceShapers {
    pub(crate) fn new(backend: Arc<dyn ShaperDevice>) -> Self {
        Self { backend, store: RwLock::new(ShaperStore::default()) }
    }

    fn caps(&self, scope: Scope) -> Result<Capabilities> {
        self.backend.capabilities(scope).ok_or(ShaperError::NotSupported(scope))
    }

    pub(crate) fn cap_get(&self, scope: Scope) -> Result<Capabilities> {
        self.caps(scope)
    }

    pub(crate) fn cap_dump(&self) -> Vec<(Scope, Capabilities)> {
        Scope::ALL
            .into_iter()
            .filter_map(|scope| self.backend.capabilities(scope).map(|caps| (scope, caps)))
            .collect()
    }

    /// Checks every supplied field against the scope's capability set.
    fn validate_spec(&self, scope: Scope, spec: &ShaperSpec) -> Result<()> {
        let caps = self.caps(scope)?;
        let require = |flag: Capabilities, field: &'static str| {
            if caps.contains(flag) {
                Ok(())
            } else {
                warn!(%scope, field, "rejecting unsupported field");
                Err(ShaperError::UnsupportedField { field, scope })
            }
        };

        match spec.metric {
            Some(Metric::Bps) => require(Capabilities::METRIC_BPS, "metric-bps")?,
            // No capability flag advertises pps, so it is never accepted.
            Some(Metric::Pps) => {
                return Err(ShaperError::UnsupportedField { field: "metric-pps", scope })
            }
            None => {}
        }
        if spec.bw_min.is_some() {
            require(Capabilities::BW_MIN, "bw-min")?;
        }
        if spec.bw_max.is_some() {
            require(Capabilities::BW_MAX, "bw-max")?;
        }
        if spec.burst.is_some() {
            require(Capabilities::BURST, "burst")?;
        }
        if spec.priority.is_some() {
            require(Capabilities::PRIORITY, "priority")?;
        }
        if spec.weight.is_some() {
            require(Capabilities::WEIGHT, "weight")?;
        }
        Ok(())
    }

    pub(crate) fn set(&self, handle: Handle, spec: &ShaperSpec) -> Result<ShaperNode> {
        let scope = handle.scope();
        if scope == Scope::Port {
            return Err(ShaperError::Invalid(format!("can't set shaper with scope {scope}")));
        }
        self.validate_spec(scope, spec)?;

        let mut store = self.store.write();
        if scope == Scope::Detached && !store.contains(handle) {
            return Err(ShaperError::Invalid(
                "use 'group' to create a detached scope shaper".to_string(),
            ));
        }

        let mut node = store.get(handle).copied().unwrap_or_else(|| ShaperNode::new(handle));
        spec.apply_to(&mut node);

        self.backend.apply_set(&node)?;
        store.insert(node);
        debug!(%handle, "shaper updated");
        Ok(node)
    }

    pub(crate) fn get(&self, handle: Handle) -> Result<ShaperNode> {
        self.store.read().get(handle).copied().ok_or(ShaperError::NotFound(handle))
    }

    pub(crate) fn dump(&self) -> Vec<ShaperNode> {
        self.store.read().dump()
    }

    pub(crate) fn delete(&self, handle: Handle) -> Result<()> {
        let mut store = self.store.write();
        let node = *store.get(handle).ok_or(ShaperError::NotFound(handle))?;
        let children = store.child_count(handle);
        if children > 0 {
            return Err(ShaperError::NotEmpty { handle, children });
        }

        // Walk upward with a worklist: removing the last child of a
        // detached node removes that node as well, one level at a time.
        let mut cursor = Some((handle, node.parent));
        while let Some((handle, parent)) = cursor {
            self.backend.apply_delete(handle)?;
            store.remove(handle);
            debug!(%handle, "shaper removed");

            cursor = parent.and_then(|parent| {
                let emptied = parent.scope() == Scope::Detached
                    && store.contains(parent)
                    && store.child_count(parent) == 0;
                emptied.then(|| (parent, store.get(parent).and_then(|n| n.parent)))
            });
        }
        Ok(())
    }

    /// Atomically reparents the inputs under the output node. Validation is
    /// two-phase: every constraint is checked against the current tree
    /// before anything is staged, and the store is only touched after the
    /// backend accepted the whole batch.
    pub(crate) fn group(&self, inputs: &[GroupInput], output: &GroupOutput) -> Result<Handle> {
        if inputs.is_empty() {
            return Err(ShaperError::Invalid("group needs at least one input".to_string()));
        }
        if !matches!(output.scope, Scope::Detached | Scope::Netdev) {
            return Err(ShaperError::Invalid(format!(
                "invalid scope {} for group output",
                output.scope
            )));
        }
        if output.scope == Scope::Netdev && output.id.unwrap_or(0) != 0 {
            return Err(ShaperError::Invalid("netdev output id must be 0".to_string()));
        }
        self.validate_spec(output.scope, &output.spec)?;

        let mut store = self.store.write();

        let explicit_output = match (output.scope, output.id) {
            (Scope::Detached, Some(id)) => {
                let handle = Handle::detached(id);
                // Groups may only target an already-allocated detached id.
                if !store.contains(handle) {
                    return Err(ShaperError::NotFound(handle));
                }
                if inputs.iter().any(|input| input.handle == handle) {
                    return Err(ShaperError::Invalid(format!(
                        "group output {handle} can't be one of its inputs"
                    )));
                }
                Some(handle)
            }
            _ => None,
        };

        if let Some(parent) = output.parent {
            if !matches!(parent.scope(), Scope::Netdev | Scope::Detached) {
                return Err(ShaperError::Invalid(format!(
                    "invalid scope {} for group output parent",
                    parent.scope()
                )));
            }
            if parent.scope() == Scope::Detached && !store.contains(parent) {
                return Err(ShaperError::NotFound(parent));
            }
            // The output must not end up among its own descendants. Walk
            // the parent's ancestor chain as it will look after the
            // reparenting, where every input hangs off the output.
            let mut cursor = Some(parent);
            while let Some(handle) = cursor {
                let reaches_output = Some(handle) == explicit_output
                    || inputs.iter().any(|input| input.handle == handle);
                if reaches_output {
                    return Err(ShaperError::Invalid(format!(
                        "group output parent {parent} creates a cycle"
                    )));
                }
                cursor = store.get(handle).and_then(|n| n.parent);
            }
        }

        for input in inputs {
            let scope = input.handle.scope();
            if !matches!(scope, Scope::Queue | Scope::Detached) {
                return Err(ShaperError::Invalid(format!(
                    "invalid scope {scope} for group input {}",
                    input.handle
                )));
            }
            if scope == Scope::Detached && !store.contains(input.handle) {
                return Err(ShaperError::Invalid(format!(
                    "group can't create detached input {}",
                    input.handle
                )));
            }
            let caps = self.caps(scope)?;
            if !caps.contains(Capabilities::NESTING) {
                return Err(ShaperError::UnsupportedField { field: "nesting", scope });
            }
            if !caps.contains(Capabilities::WEIGHT) {
                return Err(ShaperError::UnsupportedField { field: "weight", scope });
            }
            self.validate_spec(scope, &input.spec)?;
        }

        // Stage the new node states without touching the store.
        let out_handle = match (output.scope, explicit_output) {
            (Scope::Netdev, _) => Handle::netdev(),
            (_, Some(handle)) => handle,
            (_, None) => {
                let id = store.alloc_detached_id().ok_or_else(|| {
                    ShaperError::Invalid("detached scope id space exhausted".to_string())
                })?;
                Handle::detached(id)
            }
        };

        let mut out_node =
            store.get(out_handle).copied().unwrap_or_else(|| ShaperNode::new(out_handle));
        if let Some(parent) = output.parent {
            out_node.parent = Some(parent);
        }
        output.spec.apply_to(&mut out_node);

        let mut staged = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut node =
                store.get(input.handle).copied().unwrap_or_else(|| ShaperNode::new(input.handle));
            input.spec.apply_to(&mut node);
            node.parent = Some(out_handle);
            staged.push(node);
        }

        self.backend.apply_group(&staged, &out_node)?;

        // Commit. Reparenting may leave an old detached parent without
        // children; such nodes never persist.
        store.insert(out_node);
        let mut maybe_emptied = Vec::new();
        for node in &staged {
            if let Some(old_parent) = store.get(node.handle).and_then(|prev| prev.parent) {
                if old_parent.scope() == Scope::Detached && old_parent != out_handle {
                    maybe_emptied.push(old_parent);
                }
            }
            store.insert(*node);
        }
        for handle in maybe_emptied {
            let mut cursor = Some(handle);
            while let Some(handle) = cursor {
                if !store.contains(handle) || store.child_count(handle) != 0 {
                    break;
                }
                let parent = store.get(handle).and_then(|n| n.parent);
                self.backend.apply_delete(handle)?;
                store.remove(handle);
                debug!(%handle, "empty detached shaper removed");
                cursor = parent.filter(|p| p.scope() == Scope::Detached);
            }
        }

        debug!(output = %out_handle, inputs = staged.len(), "shapers grouped");
        Ok(out_handle)
    }

    /// Drops every shaper configured on the device.
    pub(crate) fn flush(&self) {
        self.store.write().clear();
    }
}
