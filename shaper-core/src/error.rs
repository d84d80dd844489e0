use thiserror::Error;

use crate::{DeviceId, Handle, Scope};

/// Result alias for shaper control operations.
pub type Result<T> = std::result::Result<T, ShaperError>;

/// Errors returned by the shaper control plane.
///
/// Every failure is reported synchronously; the engine never mutates the
/// tree on a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaperError {
    /// The device was never registered with the registry.
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),
    /// The device has no shaper support at all for the scope. Callers
    /// should treat this as "skip", not as a failed validation.
    #[error("no shaper support for scope {0}")]
    NotSupported(Scope),
    /// A supplied field is outside the scope's capability set.
    #[error("field '{field}' not supported on scope {scope}")]
    UnsupportedField {
        /// Name of the offending field.
        field: &'static str,
        /// Scope whose capability set was consulted.
        scope: Scope,
    },
    /// No materialized node exists at the handle.
    #[error("no shaper found for handle {0}")]
    NotFound(Handle),
    /// Delete attempted on a node that still has children.
    #[error("shaper {handle} still has {children} children")]
    NotEmpty {
        /// The node that was targeted.
        handle: Handle,
        /// How many children it currently has.
        children: usize,
    },
    /// Structurally malformed request, e.g. a scope/id combination that
    /// violates the nesting rules.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// The device backend refused a change that passed validation.
    #[error("device error: {0}")]
    Device(String),
}
