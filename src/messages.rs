use crate::action::Capability;

/// Continuations delivered by the host after an asynchronous request settles
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    PermissionResult { capability: Capability, granted: bool },
    CaptureResult { success: bool },
}

/// One button activation from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Camera,
    Call,
    Link,
    ExternalApp,
}
