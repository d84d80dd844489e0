use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use shaper_core::{
    Capabilities, DeviceId, Handle, Result, Scope, ShaperError, ShaperNode, ShaperSpec,
};

use crate::{
    device::ShaperDevice,
    manager::{DeviceShapers, GroupInput, GroupOutput},
};

/// The top-level control-plane object: per-device shaper trees addressed by
/// device id.
///
/// Operations on distinct devices proceed in parallel. Operations on the
/// same device serialize on that device's store lock, so `group` and
/// cascading `delete` are atomic with respect to concurrent mutations.
#[derive(Default)]
pub struct ShaperRegistry {
    devices: RwLock<FxHashMap<DeviceId, Arc<DeviceShapers>>>,
}

impl ShaperRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a backend to the device, starting from an empty tree.
    /// Re-registering a device discards any previous state.
    pub fn register(&self, dev: DeviceId, backend: Arc<dyn ShaperDevice>) {
        self.devices.write().insert(dev, Arc::new(DeviceShapers::new(backend)));
        debug!(%dev, "shaper backend registered");
    }

    /// Detaches the device, flushing every shaper configured on it.
    pub fn unregister(&self, dev: DeviceId) {
        if let Some(entry) = self.devices.write().remove(&dev) {
            entry.flush();
            debug!(%dev, "shaper backend unregistered");
        }
    }

    fn device(&self, dev: DeviceId) -> Result<Arc<DeviceShapers>> {
        self.devices.read().get(&dev).cloned().ok_or(ShaperError::DeviceNotFound(dev))
    }

    /// Returns the capability set the device advertises for the scope.
    pub fn cap_get(&self, dev: DeviceId, scope: Scope) -> Result<Capabilities> {
        self.device(dev)?.cap_get(scope)
    }

    /// Returns every scope the device supports, with its capability set, in
    /// scope order.
    pub fn cap_dump(&self, dev: DeviceId) -> Result<Vec<(Scope, Capabilities)>> {
        Ok(self.device(dev)?.cap_dump())
    }

    /// Creates or updates the node at `handle`, merging the supplied fields
    /// over the existing configuration. Returns the resulting record.
    pub fn set(&self, dev: DeviceId, handle: Handle, spec: &ShaperSpec) -> Result<ShaperNode> {
        self.device(dev)?.set(handle, spec)
    }

    /// Looks up a single materialized node.
    pub fn get(&self, dev: DeviceId, handle: Handle) -> Result<ShaperNode> {
        self.device(dev)?.get(handle)
    }

    /// Returns every materialized node on the device, ordered by (nesting
    /// depth, scope, id). Empty when nothing has been configured.
    pub fn dump(&self, dev: DeviceId) -> Result<Vec<ShaperNode>> {
        Ok(self.device(dev)?.dump())
    }

    /// Deletes the node at `handle`, cascading upward through detached
    /// parents left without children.
    pub fn delete(&self, dev: DeviceId, handle: Handle) -> Result<()> {
        self.device(dev)?.delete(handle)
    }

    /// Atomically reparents the input nodes under the output node,
    /// returning the resolved output handle.
    pub fn group(
        &self,
        dev: DeviceId,
        inputs: &[GroupInput],
        output: &GroupOutput,
    ) -> Result<Handle> {
        self.device(dev)?.group(inputs, output)
    }
}
