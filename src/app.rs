use crate::action::{ActionRequest, DispatchOutcome};
use crate::broker::ActionBroker;
use crate::config::Config;
use crate::dispatcher::{CapabilityDispatcher, DispatcherState};
use crate::host::DesktopBroker;
use crate::messages::{HostEvent, Trigger};
use crate::notifier::{DesktopNotifier, Notifier};
use crate::triggers;

use anyhow::Result;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutcomeSource {
    Trigger,
    PermissionResult,
    CaptureResult,
}

pub struct App<B: ActionBroker> {
    config: Config,
    dispatcher: CapabilityDispatcher<B>,
    notifier: Box<dyn Notifier>,
    trigger_rx: mpsc::Receiver<Trigger>,
    event_rx: mpsc::UnboundedReceiver<HostEvent>,
}

impl App<DesktopBroker> {
    pub fn new(config: Config) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let broker = DesktopBroker::new(&config, event_tx)?;
        let notifier = Box::new(
            DesktopNotifier::new(&config.app_name, config.desktop_notifications)
                .with_program(&config.notify_program),
        );
        let trigger_rx = Self::setup_trigger_input();

        tracing::info!("Ready! Type camera, call, link or app and press Enter");

        Ok(Self::from_parts(config, broker, notifier, trigger_rx, event_rx))
    }

    fn setup_trigger_input() -> mpsc::Receiver<Trigger> {
        let (trigger_tx, trigger_rx) = mpsc::channel(10);
        triggers::spawn_stdin_monitor(trigger_tx);
        trigger_rx
    }
}

impl<B: ActionBroker> App<B> {
    pub fn from_parts(
        config: Config,
        broker: B,
        notifier: Box<dyn Notifier>,
        trigger_rx: mpsc::Receiver<Trigger>,
        event_rx: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Self {
        let dispatcher = CapabilityDispatcher::new(broker, &config);
        Self {
            config,
            dispatcher,
            notifier,
            trigger_rx,
            event_rx,
        }
    }

    /// Run until Ctrl+C, or until input closes with nothing left in flight
    pub async fn run(mut self) -> Result<()> {
        let mut input_open = true;

        loop {
            tracing::debug!("Main loop: waiting for event");
            tokio::select! {
                biased;

                trigger = self.trigger_rx.recv(), if input_open => match trigger {
                    Some(trigger) => self.handle_trigger(trigger).await,
                    None => {
                        tracing::info!("Trigger input closed");
                        input_open = false;
                    }
                },

                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event).await;
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }

            if !input_open && *self.dispatcher.state() == DispatcherState::Idle {
                break;
            }
        }

        tracing::info!("Shutdown complete");
        Ok(())
    }

    fn request_for(&self, trigger: Trigger) -> ActionRequest {
        match trigger {
            Trigger::Camera => ActionRequest::Capture,
            Trigger::Call => ActionRequest::Dial,
            Trigger::Link => ActionRequest::OpenUrl(self.config.web_url.clone()),
            Trigger::ExternalApp => ActionRequest::OpenExternalApp {
                primary_target: self.config.external_app_target.clone(),
                fallback_url: self.config.external_app_fallback.clone(),
            },
        }
    }

    async fn handle_trigger(&mut self, trigger: Trigger) {
        let request = self.request_for(trigger);
        tracing::info!("{:?} pressed, dispatching {}", trigger, request.label());

        let outcome = self.dispatcher.dispatch(request);
        self.render(outcome, OutcomeSource::Trigger).await;
    }

    async fn handle_event(&mut self, event: HostEvent) {
        tracing::debug!("Host event: {:?}", event);

        let (outcome, source) = match event {
            HostEvent::PermissionResult {
                capability,
                granted,
            } => (
                self.dispatcher.on_permission_result(capability, granted),
                OutcomeSource::PermissionResult,
            ),
            HostEvent::CaptureResult { success } => (
                self.dispatcher.on_capture_result(success),
                OutcomeSource::CaptureResult,
            ),
        };

        if let Some(outcome) = outcome {
            self.render(outcome, source).await;
        }
    }

    async fn render(&self, outcome: DispatchOutcome, source: OutcomeSource) {
        tracing::debug!("Outcome from {:?}: {:?}", source, outcome);

        let message = match (&outcome, source) {
            (DispatchOutcome::Success, OutcomeSource::CaptureResult) => {
                Some(self.config.messages.capture_saved.as_str())
            }
            (DispatchOutcome::Success, _) => {
                tracing::info!("Handed off to external handler");
                None
            }
            (DispatchOutcome::PermissionRequestPending, _) => {
                tracing::info!("Waiting for camera permission");
                None
            }
            (DispatchOutcome::CapturePending, _) => {
                tracing::info!("Waiting for capture to finish");
                None
            }
            (other, _) => other.user_message(),
        };

        if let Some(message) = message {
            if let Err(e) = self.notifier.notify(message).await {
                tracing::warn!("Failed to show notification: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{
        ActionDescriptor, Capability, DestinationHandle, DestinationKind, DestinationMetadata,
        PermissionState,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct StubBroker {
        resolvable: bool,
    }

    impl ActionBroker for StubBroker {
        fn resolve(&self, _descriptor: &ActionDescriptor) -> bool {
            self.resolvable
        }

        fn invoke(&self, _descriptor: &ActionDescriptor) -> Result<()> {
            Ok(())
        }

        fn invoke_for_result(
            &self,
            _descriptor: &ActionDescriptor,
            _destination: &DestinationHandle,
        ) -> Result<()> {
            Ok(())
        }

        fn query_permission(&self, _capability: Capability) -> PermissionState {
            PermissionState::NotRequested
        }

        fn request_permission(&self, _capability: Capability) -> Result<()> {
            Ok(())
        }

        fn create_destination(
            &self,
            _kind: DestinationKind,
            _metadata: &DestinationMetadata,
        ) -> Result<DestinationHandle> {
            Ok(DestinationHandle {
                uri: "file:///tmp/IMG_test.jpg".to_string(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        shown: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str) -> Result<()> {
            self.shown.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn app(
        resolvable: bool,
    ) -> (
        App<StubBroker>,
        RecordingNotifier,
        mpsc::Sender<Trigger>,
        mpsc::UnboundedSender<HostEvent>,
    ) {
        let notifier = RecordingNotifier::default();
        let (trigger_tx, trigger_rx) = mpsc::channel(10);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let app = App::from_parts(
            Config::default(),
            StubBroker { resolvable },
            Box::new(notifier.clone()),
            trigger_rx,
            event_rx,
        );
        (app, notifier, trigger_tx, event_tx)
    }

    #[test]
    fn test_request_for_uses_config() {
        let (app, _, _, _) = app(true);

        assert_eq!(app.request_for(Trigger::Camera), ActionRequest::Capture);
        assert_eq!(app.request_for(Trigger::Call), ActionRequest::Dial);
        assert_eq!(
            app.request_for(Trigger::Link),
            ActionRequest::OpenUrl("https://chatgpt.com".to_string())
        );
        assert_eq!(
            app.request_for(Trigger::ExternalApp),
            ActionRequest::OpenExternalApp {
                primary_target: "instagram://feed".to_string(),
                fallback_url: "https://www.instagram.com/".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_browser_is_notified() {
        let (mut app, notifier, _, _) = app(false);

        app.handle_trigger(Trigger::Link).await;

        assert_eq!(
            *notifier.shown.lock().unwrap(),
            vec!["Browser not found".to_string()]
        );
    }

    #[tokio::test]
    async fn test_successful_handoff_is_silent() {
        let (mut app, notifier, _, _) = app(true);

        app.handle_trigger(Trigger::Call).await;
        app.handle_trigger(Trigger::Link).await;

        assert!(notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capture_round_trip_notifies_once_saved() {
        let (mut app, notifier, _, _) = app(true);

        app.handle_trigger(Trigger::Camera).await;
        app.handle_event(HostEvent::PermissionResult {
            capability: Capability::Camera,
            granted: true,
        })
        .await;
        assert!(notifier.shown.lock().unwrap().is_empty());

        app.handle_event(HostEvent::CaptureResult { success: true })
            .await;

        assert_eq!(
            *notifier.shown.lock().unwrap(),
            vec!["Photo saved to gallery".to_string()]
        );
    }

    #[tokio::test]
    async fn test_denied_permission_is_notified() {
        let (mut app, notifier, _, _) = app(true);

        app.handle_trigger(Trigger::Camera).await;
        app.handle_event(HostEvent::PermissionResult {
            capability: Capability::Camera,
            granted: false,
        })
        .await;

        assert_eq!(
            *notifier.shown.lock().unwrap(),
            vec!["Camera permission denied".to_string()]
        );
    }

    #[tokio::test]
    async fn test_run_drains_pending_capture_before_exit() {
        let (app, notifier, trigger_tx, event_tx) = app(true);

        trigger_tx.send(Trigger::Camera).await.unwrap();
        drop(trigger_tx);
        event_tx
            .send(HostEvent::PermissionResult {
                capability: Capability::Camera,
                granted: true,
            })
            .unwrap();
        event_tx
            .send(HostEvent::CaptureResult { success: false })
            .unwrap();

        app.run().await.unwrap();

        assert!(notifier.shown.lock().unwrap().is_empty());
    }
}
