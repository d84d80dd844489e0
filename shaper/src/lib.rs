//! A hierarchical bandwidth-shaper control plane for network devices.
//!
//! Devices register a [`ShaperDevice`] backend with a [`ShaperRegistry`];
//! callers then configure per-device trees of shaping nodes through
//! `set` / `get` / `delete` / `group` operations, validated against the
//! capabilities the backend advertises.
//!
//! ```
//! use std::sync::Arc;
//! use shaper::{DeviceId, Handle, Metric, ShaperRegistry, ShaperSpec, SoftDevice};
//!
//! let registry = ShaperRegistry::new();
//! let dev = DeviceId::new(1);
//! registry.register(dev, Arc::new(SoftDevice::permissive()));
//!
//! let spec = ShaperSpec::new().metric(Metric::Bps).bw_max(10_000);
//! let node = registry.set(dev, Handle::queue(1), &spec).unwrap();
//! assert_eq!(node.bw_max, 10_000);
//! assert_eq!(node.parent, Some(Handle::netdev()));
//! ```
#![doc(issue_tracker_base_url = "https://github.com/chainbound/shaper-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use shaper_core::*;
pub use shaper_manager::*;
