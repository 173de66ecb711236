use crate::action::{
    ActionDescriptor, ActionRequest, Capability, DestinationHandle, DestinationKind,
    DestinationMetadata, DispatchOutcome, PermissionState,
};
use crate::broker::ActionBroker;
use crate::config::{Config, Messages};
use std::time::{SystemTime, UNIX_EPOCH};

/// Destination committed to the capture handler, held until its result arrives
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCapture {
    pub destination: DestinationHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatcherState {
    Idle,
    AwaitingPermission,
    AwaitingCaptureResult(PendingCapture),
}

/// Turns action requests into broker calls and outcomes
///
/// Every action shares the same shape:
/// - resolve a handler (except dial, which the host always answers)
/// - gate sensitive access behind a permission round trip
/// - invoke the first resolvable handler
/// - report an outcome for the presentation layer
///
/// Capture is the only action with host continuations. They are fed back in
/// through `on_permission_result` and `on_capture_result`; the pending
/// destination lives inside the state, so there is never more than one.
pub struct CapabilityDispatcher<B: ActionBroker> {
    broker: B,
    state: DispatcherState,
    dial_uri: String,
    capture_album: String,
    messages: Messages,
}

impl<B: ActionBroker> CapabilityDispatcher<B> {
    pub fn new(broker: B, config: &Config) -> Self {
        Self {
            broker,
            state: DispatcherState::Idle,
            dial_uri: config.dial_uri.clone(),
            capture_album: config.capture_album.clone(),
            messages: config.messages.clone(),
        }
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    pub fn dispatch(&mut self, request: ActionRequest) -> DispatchOutcome {
        tracing::debug!("dispatch: {:?} (state = {:?})", request, self.state);

        match request {
            ActionRequest::Capture => self.dispatch_capture(),
            ActionRequest::Dial => self.dispatch_dial(),
            ActionRequest::OpenUrl(url) => self.dispatch_open_url(url),
            ActionRequest::OpenExternalApp {
                primary_target,
                fallback_url,
            } => self.dispatch_external_app(primary_target, fallback_url),
        }
    }

    /// Feed in the answer to a permission request issued by `dispatch(Capture)`
    pub fn on_permission_result(
        &mut self,
        capability: Capability,
        granted: bool,
    ) -> Option<DispatchOutcome> {
        if self.state != DispatcherState::AwaitingPermission {
            tracing::warn!(
                "Ignoring {} permission result while {:?}",
                capability.as_str(),
                self.state
            );
            return None;
        }

        self.state = DispatcherState::Idle;

        if granted {
            tracing::info!("{} permission granted", capability.as_str());
            Some(self.launch_capture())
        } else {
            tracing::info!("{} permission denied", capability.as_str());
            Some(DispatchOutcome::PermissionDenied(
                self.messages.permission_denied.clone(),
            ))
        }
    }

    /// Feed in the capture handler's result. Cancellation is a `false` result.
    pub fn on_capture_result(&mut self, success: bool) -> Option<DispatchOutcome> {
        let pending = match std::mem::replace(&mut self.state, DispatcherState::Idle) {
            DispatcherState::AwaitingCaptureResult(pending) => pending,
            other => {
                tracing::warn!("Ignoring capture result while {:?}", other);
                self.state = other;
                return None;
            }
        };

        if success {
            tracing::info!("Capture saved to {}", pending.destination.uri);
            Some(DispatchOutcome::Success)
        } else {
            tracing::info!("Capture cancelled, releasing {}", pending.destination.uri);
            self.broker.release_destination(&pending.destination);
            None
        }
    }

    fn dispatch_capture(&mut self) -> DispatchOutcome {
        if self.state != DispatcherState::Idle {
            tracing::debug!("Capture already in flight, rejecting");
            return DispatchOutcome::Busy(self.messages.capture_busy.clone());
        }

        match self.broker.query_permission(Capability::Camera) {
            PermissionState::Granted => self.launch_capture(),
            PermissionState::Denied | PermissionState::NotRequested => {
                match self.broker.request_permission(Capability::Camera) {
                    Ok(()) => {
                        self.state = DispatcherState::AwaitingPermission;
                        DispatchOutcome::PermissionRequestPending
                    }
                    Err(e) => {
                        tracing::error!("Failed to request camera permission: {}", e);
                        DispatchOutcome::PermissionDenied(self.messages.permission_denied.clone())
                    }
                }
            }
        }
    }

    /// Only reached once camera permission is known to be granted
    fn launch_capture(&mut self) -> DispatchOutcome {
        let metadata = DestinationMetadata::jpeg(unix_time_ms(), &self.capture_album);

        let destination = match self
            .broker
            .create_destination(DestinationKind::Image, &metadata)
        {
            Ok(destination) => destination,
            Err(e) => {
                tracing::error!("Failed to create capture destination: {:#}", e);
                return DispatchOutcome::DestinationCreationFailed(
                    self.messages.destination_failed.clone(),
                );
            }
        };

        let descriptor = ActionDescriptor::image_capture();
        if let Err(e) = self.broker.invoke_for_result(&descriptor, &destination) {
            tracing::error!("Failed to launch capture handler: {:#}", e);
            self.broker.release_destination(&destination);
            return DispatchOutcome::HandlerMissing(self.messages.camera_not_found.clone());
        }

        tracing::debug!("Awaiting capture result for {}", destination.uri);
        self.state = DispatcherState::AwaitingCaptureResult(PendingCapture { destination });
        DispatchOutcome::CapturePending
    }

    // Dialing is not resolved first: the host is assumed to always have a dialer.
    fn dispatch_dial(&mut self) -> DispatchOutcome {
        let descriptor = ActionDescriptor::dial(self.dial_uri.clone());
        self.invoke_or(&descriptor, &self.messages.dialer_not_found)
    }

    fn dispatch_open_url(&mut self, url: String) -> DispatchOutcome {
        let descriptor = ActionDescriptor::view(url);

        if !self.broker.resolve(&descriptor) {
            tracing::info!("No handler for {}", descriptor);
            return DispatchOutcome::HandlerMissing(self.messages.browser_not_found.clone());
        }

        self.invoke_or(&descriptor, &self.messages.browser_not_found)
    }

    fn dispatch_external_app(
        &mut self,
        primary_target: String,
        fallback_url: String,
    ) -> DispatchOutcome {
        let chain = [
            ActionDescriptor::view(primary_target),
            ActionDescriptor::view(fallback_url),
        ];

        match chain.iter().find(|d| self.broker.resolve(d)) {
            Some(descriptor) => {
                tracing::debug!("External app resolved to {}", descriptor);
                self.invoke_or(descriptor, &self.messages.external_app_not_found)
            }
            None => {
                tracing::info!("Neither external app target nor fallback is resolvable");
                DispatchOutcome::HandlerMissing(self.messages.external_app_not_found.clone())
            }
        }
    }

    fn invoke_or(&self, descriptor: &ActionDescriptor, failure_message: &str) -> DispatchOutcome {
        match self.broker.invoke(descriptor) {
            Ok(()) => DispatchOutcome::Success,
            Err(e) => {
                tracing::warn!("Failed to invoke {}: {:#}", descriptor, e);
                DispatchOutcome::HandlerMissing(failure_message.to_string())
            }
        }
    }
}

fn unix_time_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
