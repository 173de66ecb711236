use crate::action::{
    ActionDescriptor, Capability, DestinationHandle, DestinationKind, DestinationMetadata,
    PermissionState,
};
use anyhow::Result;

/// Host boundary for activity resolution, permission brokering and storage
///
/// Calls return as soon as the host has accepted the request. The two
/// asynchronous requests (`request_permission`, `invoke_for_result`) settle
/// later as a `HostEvent` on the channel the broker was built with.
pub trait ActionBroker {
    /// True if some installed handler can satisfy the descriptor
    fn resolve(&self, descriptor: &ActionDescriptor) -> bool;

    /// Hand execution off to a handler
    fn invoke(&self, descriptor: &ActionDescriptor) -> Result<()>;

    /// Hand off with a destination; completion arrives as `HostEvent::CaptureResult`
    fn invoke_for_result(
        &self,
        descriptor: &ActionDescriptor,
        destination: &DestinationHandle,
    ) -> Result<()>;

    fn query_permission(&self, capability: Capability) -> PermissionState;

    /// Ask the user; the answer arrives as `HostEvent::PermissionResult`
    fn request_permission(&self, capability: Capability) -> Result<()>;

    fn create_destination(
        &self,
        kind: DestinationKind,
        metadata: &DestinationMetadata,
    ) -> Result<DestinationHandle>;

    /// Give back a destination that was never written
    fn release_destination(&self, _destination: &DestinationHandle) {}
}
