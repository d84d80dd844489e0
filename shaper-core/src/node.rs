use crate::Handle;

/// The unit a shaper's rate values are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Bits per second.
    #[default]
    Bps,
    /// Packets per second. Defined by the control protocol but not
    /// advertised by any capability flag, so validation rejects it.
    Pps,
}

/// A single shaping node, as recorded by the control plane.
///
/// Zeroed rate fields are considered not set. Responses always carry every
/// field, even when the request that created the node omitted some.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaperNode {
    /// Unique identity of this node on its device.
    pub handle: Handle,
    /// Structural parent. Implied by the handle scope unless the node has
    /// been grouped under a detached shaper. `None` only for the port root.
    pub parent: Option<Handle>,
    /// Unit of the rate fields.
    pub metric: Metric,
    /// Minimum guaranteed bandwidth.
    pub bw_min: u64,
    /// Maximum allowed bandwidth.
    pub bw_max: u64,
    /// Maximum burst allowance for the peak rate.
    pub burst: u64,
    /// Strict scheduling priority among siblings.
    pub priority: u32,
    /// Weighted round-robin weight, meaningful for nodes aggregated under a
    /// detached parent.
    pub weight: u32,
}

impl ShaperNode {
    /// Creates a node with default (unset) attributes and the parent
    /// implied by the handle's scope.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            parent: handle.scope().default_parent(),
            metric: Metric::default(),
            bw_min: 0,
            bw_max: 0,
            burst: 0,
            priority: 0,
            weight: 0,
        }
    }
}

/// A partial attribute set carried by `set` and `group` requests.
///
/// Every field is optional: omitted fields keep their previous value when
/// the target node already exists, so an update is a merge, not a replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaperSpec {
    /// Unit of the rate fields.
    pub metric: Option<Metric>,
    /// Minimum guaranteed bandwidth.
    pub bw_min: Option<u64>,
    /// Maximum allowed bandwidth.
    pub bw_max: Option<u64>,
    /// Maximum burst allowance for the peak rate.
    pub burst: Option<u64>,
    /// Strict scheduling priority among siblings.
    pub priority: Option<u32>,
    /// Weighted round-robin weight.
    pub weight: Option<u32>,
}

impl ShaperSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rate metric.
    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Sets the minimum guaranteed bandwidth.
    pub fn bw_min(mut self, bw_min: u64) -> Self {
        self.bw_min = Some(bw_min);
        self
    }

    /// Sets the maximum allowed bandwidth.
    pub fn bw_max(mut self, bw_max: u64) -> Self {
        self.bw_max = Some(bw_max);
        self
    }

    /// Sets the burst allowance.
    pub fn burst(mut self, burst: u64) -> Self {
        self.burst = Some(burst);
        self
    }

    /// Sets the scheduling priority.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the scheduling weight.
    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Merges the supplied fields into the node, leaving omitted fields
    /// untouched.
    pub fn apply_to(&self, node: &mut ShaperNode) {
        if let Some(metric) = self.metric {
            node.metric = metric;
        }
        if let Some(bw_min) = self.bw_min {
            node.bw_min = bw_min;
        }
        if let Some(bw_max) = self.bw_max {
            node.bw_max = bw_max;
        }
        if let Some(burst) = self.burst {
            node.burst = burst;
        }
        if let Some(priority) = self.priority {
            node.priority = priority;
        }
        if let Some(weight) = self.weight {
            node.weight = weight;
        }
    }
}
