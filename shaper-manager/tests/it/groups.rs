use std::sync::Arc;

use shaper_core::{
    Capabilities, Handle, Metric, Result, Scope, ShaperError, ShaperNode, ShaperSpec,
};
use shaper_manager::{GroupInput, GroupOutput, ShaperDevice, ShaperRegistry, SoftDevice};

use crate::{init_tracing, limited_registry, permissive_registry, DEV};

fn bps_weight(weight: u32) -> ShaperSpec {
    ShaperSpec::new().metric(Metric::Bps).weight(weight)
}

#[test]
fn group_allocates_detached_output() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [
        GroupInput::new(Handle::queue(1), bps_weight(3)),
        GroupInput::new(Handle::queue(2), bps_weight(2)),
    ];
    let output = GroupOutput::detached()
        .with_spec(ShaperSpec::new().metric(Metric::Bps).bw_max(10_000));

    let out = registry.group(DEV, &inputs, &output).unwrap();
    assert_eq!(out, Handle::detached(0));

    // The re-parented input carries its weight but no rate fields.
    let expected = ShaperNode {
        handle: Handle::queue(1),
        parent: Some(out),
        metric: Metric::Bps,
        bw_min: 0,
        bw_max: 0,
        burst: 0,
        priority: 0,
        weight: 3,
    };
    assert_eq!(registry.get(DEV, Handle::queue(1)).unwrap(), expected);

    // The output took the supplied rate parameters and the default parent.
    let out_node = registry.get(DEV, out).unwrap();
    assert_eq!(out_node.parent, Some(Handle::netdev()));
    assert_eq!(out_node.bw_max, 10_000);

    let handles: Vec<_> = registry.dump(DEV).unwrap().into_iter().map(|n| n.handle).collect();
    assert_eq!(handles, vec![Handle::queue(1), Handle::queue(2), out]);
}

#[test]
fn group_to_missing_explicit_output_fails() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [GroupInput::new(Handle::queue(3), bps_weight(3))];
    let output = GroupOutput::detached_id(99);

    let err = registry.group(DEV, &inputs, &output).unwrap_err();
    assert_eq!(err, ShaperError::NotFound(Handle::detached(99)));
    assert!(registry.dump(DEV).unwrap().is_empty());
}

#[test]
fn group_appends_to_existing_output() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [
        GroupInput::new(Handle::queue(1), bps_weight(3)),
        GroupInput::new(Handle::queue(2), bps_weight(2)),
    ];
    let output = GroupOutput::detached()
        .with_spec(ShaperSpec::new().metric(Metric::Bps).bw_max(10_000));
    let out = registry.group(DEV, &inputs, &output).unwrap();

    // Append a third queue; the output keeps its rate parameters.
    let more = [GroupInput::new(Handle::queue(3), bps_weight(4))];
    let appended = registry.group(DEV, &more, &GroupOutput::detached_id(out.id())).unwrap();
    assert_eq!(appended, out);

    let q3 = registry.get(DEV, Handle::queue(3)).unwrap();
    assert_eq!(q3.parent, Some(out));
    assert_eq!(q3.weight, 4);
    assert_eq!(registry.get(DEV, out).unwrap().bw_max, 10_000);
}

#[test]
fn regroup_with_same_output_is_idempotent() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [
        GroupInput::new(Handle::queue(1), bps_weight(3)),
        GroupInput::new(Handle::queue(2), bps_weight(2)),
    ];
    let out = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap();

    let before = registry.dump(DEV).unwrap();
    registry.group(DEV, &inputs, &GroupOutput::detached_id(out.id())).unwrap();
    assert_eq!(registry.dump(DEV).unwrap(), before);
}

#[test]
fn nonempty_group_resists_deletion_then_cascades() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [
        GroupInput::new(Handle::queue(1), bps_weight(3)),
        GroupInput::new(Handle::queue(2), bps_weight(2)),
    ];
    let out = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap();

    let err = registry.delete(DEV, out).unwrap_err();
    assert_eq!(err, ShaperError::NotEmpty { handle: out, children: 2 });
    assert_eq!(registry.dump(DEV).unwrap().len(), 3);

    registry.delete(DEV, Handle::queue(1)).unwrap();
    assert!(registry.get(DEV, out).is_ok());

    // Removing the last input removes the output implicitly.
    registry.delete(DEV, Handle::queue(2)).unwrap();
    assert!(registry.dump(DEV).unwrap().is_empty());
}

#[test]
fn cascade_walks_nested_detached_levels() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [
        GroupInput::new(Handle::queue(1), bps_weight(3)),
        GroupInput::new(Handle::queue(2), bps_weight(2)),
    ];
    let inner = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap();

    // Nest the inner group under a second detached level.
    let outer = registry
        .group(DEV, &[GroupInput::new(inner, bps_weight(5))], &GroupOutput::detached())
        .unwrap();
    assert_ne!(inner, outer);
    assert_eq!(registry.get(DEV, inner).unwrap().parent, Some(outer));

    registry.delete(DEV, Handle::queue(1)).unwrap();
    registry.delete(DEV, Handle::queue(2)).unwrap();
    assert!(registry.dump(DEV).unwrap().is_empty());
}

#[test]
fn group_onto_netdev_output() {
    init_tracing();
    let registry = permissive_registry();

    let out = registry
        .group(DEV, &[GroupInput::new(Handle::queue(1), bps_weight(1))], &GroupOutput::netdev())
        .unwrap();
    assert_eq!(out, Handle::netdev());

    assert_eq!(registry.get(DEV, Handle::queue(1)).unwrap().parent, Some(Handle::netdev()));
    assert_eq!(registry.get(DEV, Handle::netdev()).unwrap().parent, Some(Handle::port()));
}

#[test]
fn group_output_under_existing_detached_parent() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [GroupInput::new(Handle::queue(1), bps_weight(3))];
    let inner = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap();

    // A second group placed explicitly below the first one.
    let nested = registry
        .group(
            DEV,
            &[GroupInput::new(Handle::queue(2), bps_weight(2))],
            &GroupOutput::detached().with_parent(inner),
        )
        .unwrap();

    assert_ne!(nested, inner);
    assert_eq!(registry.get(DEV, nested).unwrap().parent, Some(inner));
    assert_eq!(registry.get(DEV, inner).unwrap().parent, Some(Handle::netdev()));
}

#[test]
fn group_output_parent_must_exist() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [GroupInput::new(Handle::queue(1), bps_weight(1))];
    let output = GroupOutput::detached().with_parent(Handle::detached(9));

    let err = registry.group(DEV, &inputs, &output).unwrap_err();
    assert_eq!(err, ShaperError::NotFound(Handle::detached(9)));
    assert!(registry.dump(DEV).unwrap().is_empty());
}

#[test]
fn group_output_parent_scope_is_checked() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [GroupInput::new(Handle::queue(1), bps_weight(1))];
    let output = GroupOutput::detached().with_parent(Handle::queue(5));

    let err = registry.group(DEV, &inputs, &output).unwrap_err();
    assert!(matches!(err, ShaperError::Invalid(_)));
}

#[test]
fn group_output_rejects_cyclic_parent() {
    init_tracing();
    let registry = permissive_registry();

    let inputs = [
        GroupInput::new(Handle::queue(1), bps_weight(3)),
        GroupInput::new(Handle::queue(2), bps_weight(2)),
    ];
    let inner = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap();
    let outer = registry
        .group(DEV, &[GroupInput::new(inner, bps_weight(5))], &GroupOutput::detached())
        .unwrap();

    // Hanging the outer node below its own descendant would close a loop
    // of detached nodes that no cascade could ever remove.
    let more = [GroupInput::new(Handle::queue(3), bps_weight(1))];
    let output = GroupOutput::detached_id(outer.id()).with_parent(inner);
    let err = registry.group(DEV, &more, &output).unwrap_err();
    assert!(matches!(err, ShaperError::Invalid(_)));

    // Same loop through an input: a fresh output can't sit under a node it
    // is about to adopt.
    let output = GroupOutput::detached().with_parent(inner);
    let err = registry
        .group(DEV, &[GroupInput::new(inner, bps_weight(1))], &output)
        .unwrap_err();
    assert!(matches!(err, ShaperError::Invalid(_)));

    // Nothing was staged: the hierarchy is exactly as before.
    assert_eq!(registry.get(DEV, inner).unwrap().parent, Some(outer));
    assert_eq!(registry.get(DEV, outer).unwrap().parent, Some(Handle::netdev()));
    assert!(registry.get(DEV, Handle::queue(3)).is_err());
}

#[test]
fn group_inputs_must_nest() {
    init_tracing();
    let registry = ShaperRegistry::new();
    let device = SoftDevice::new()
        .with_scope(Scope::Detached, Capabilities::all())
        .with_scope(Scope::Queue, Capabilities::METRIC_BPS | Capabilities::WEIGHT);
    registry.register(DEV, Arc::new(device));

    let inputs = [GroupInput::new(Handle::queue(1), ShaperSpec::new().weight(1))];
    let err = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap_err();

    // The queue scope advertises no nesting support.
    assert_eq!(err, ShaperError::UnsupportedField { field: "nesting", scope: Scope::Queue });
}

#[test]
fn group_output_scope_must_be_supported() {
    init_tracing();
    let registry = limited_registry();

    let inputs = [GroupInput::new(Handle::queue(1), ShaperSpec::new().weight(1))];
    let err = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap_err();

    // The limited device has no detached scope support at all.
    assert_eq!(err, ShaperError::NotSupported(Scope::Detached));
}

#[test]
fn group_rejects_invalid_shapes() {
    init_tracing();
    let registry = permissive_registry();

    // No inputs.
    let err = registry.group(DEV, &[], &GroupOutput::detached()).unwrap_err();
    assert!(matches!(err, ShaperError::Invalid(_)));

    // Netdev scope nodes cannot be grouped as inputs.
    let inputs = [GroupInput::new(Handle::netdev(), ShaperSpec::new())];
    let err = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap_err();
    assert!(matches!(err, ShaperError::Invalid(_)));

    // A detached input must already exist.
    let inputs = [GroupInput::new(Handle::detached(5), ShaperSpec::new())];
    let err = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap_err();
    assert!(matches!(err, ShaperError::Invalid(_)));
}

/// A backend that advertises everything but refuses every change.
#[derive(Debug, Default)]
struct RejectingDevice;

impl ShaperDevice for RejectingDevice {
    fn capabilities(&self, _scope: Scope) -> Option<Capabilities> {
        Some(Capabilities::all())
    }

    fn apply_set(&self, _shaper: &ShaperNode) -> Result<()> {
        Err(ShaperError::Device("set refused".to_string()))
    }

    fn apply_delete(&self, _handle: Handle) -> Result<()> {
        Err(ShaperError::Device("delete refused".to_string()))
    }

    fn apply_group(&self, _inputs: &[ShaperNode], _output: &ShaperNode) -> Result<()> {
        Err(ShaperError::Device("group refused".to_string()))
    }
}

#[test]
fn backend_rejection_leaves_tree_unchanged() {
    init_tracing();
    let registry = ShaperRegistry::new();
    registry.register(DEV, Arc::new(RejectingDevice));

    let err = registry
        .set(DEV, Handle::queue(1), &ShaperSpec::new().bw_max(10_000))
        .unwrap_err();
    assert!(matches!(err, ShaperError::Device(_)));
    assert!(registry.dump(DEV).unwrap().is_empty());

    let inputs = [GroupInput::new(Handle::queue(1), bps_weight(1))];
    let err = registry.group(DEV, &inputs, &GroupOutput::detached()).unwrap_err();
    assert!(matches!(err, ShaperError::Device(_)));
    assert!(registry.dump(DEV).unwrap().is_empty());
}
