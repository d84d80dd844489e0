use rustc_hash::{FxHashMap, FxHashSet};

use shaper_core::{Handle, ShaperNode, ID_UNSPEC};

/// Authoritative per-device tree of shaper nodes.
///
/// Nodes live in a primary map keyed by handle. A secondary index maps a
/// parent handle to the set of its children and is maintained on every
/// mutation rather than recomputed per query. Children are indexed under
/// their parent handle even when the parent itself is not materialized:
/// queue nodes count as children of the netdev singleton before anyone has
/// configured it.
#[derive(Debug, Default)]
pub(crate) struct ShaperStore {
    nodes: FxHashMap<Handle, ShaperNode>,
    children: FxHashMap<Handle, FxHashSet<Handle>>,
    /// Monotonic detached-scope id allocator. Ids retire, never recycle.
    next_detached_id: u32,
}

impl ShaperStore {
    pub(crate) fn get(&self, handle: Handle) -> Option<&ShaperNode> {
        self.nodes.get(&handle)
    }

    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.nodes.contains_key(&handle)
    }

    pub(crate) fn child_count(&self, handle: Handle) -> usize {
        self.children.get(&handle).map_or(0, |children| children.len())
    }

    /// Allocates a fresh detached-scope id, or `None` once the id space is
    /// exhausted. `ID_UNSPEC` and everything past it stay reserved.
    pub(crate) fn alloc_detached_id(&mut self) -> Option<u32> {
        if self.next_detached_id >= ID_UNSPEC {
            return None;
        }
        let id = self.next_detached_id;
        self.next_detached_id += 1;
        Some(id)
    }

    /// Inserts or replaces a node, keeping the children index consistent
    /// across reparenting.
    pub(crate) fn insert(&mut self, node: ShaperNode) {
        if let Some(old) = self.nodes.insert(node.handle, node) {
            if old.parent != node.parent {
                self.unlink(old.handle, old.parent);
            } else {
                return;
            }
        }
        if let Some(parent) = node.parent {
            self.children.entry(parent).or_default().insert(node.handle);
        }
    }

    /// Removes a node. The caller must have rejected the removal already if
    /// the node still has children.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<ShaperNode> {
        let node = self.nodes.remove(&handle)?;
        debug_assert_eq!(self.child_count(handle), 0, "removing shaper with live children");
        self.children.remove(&handle);
        self.unlink(handle, node.parent);
        Some(node)
    }

    fn unlink(&mut self, handle: Handle, parent: Option<Handle>) {
        if let Some(parent) = parent {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(&handle);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
    }

    /// Returns every materialized node, ordered by (nesting depth, scope,
    /// id).
    pub(crate) fn dump(&self) -> Vec<ShaperNode> {
        let mut nodes: Vec<_> = self.nodes.values().copied().collect();
        nodes.sort_by_key(|node| node.handle);
        nodes
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.children.clear();
    }
}
