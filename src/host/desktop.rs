use crate::action::{
    ActionDescriptor, Capability, DestinationHandle, DestinationKind, DestinationMetadata,
    PermissionState,
};
use crate::broker::ActionBroker;
use crate::config::Config;
use crate::messages::HostEvent;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

const FILE_SCHEME: &str = "file://";

/// Action broker backed by shell command templates
///
/// Handlers are looked up by URI scheme (or `capture`) and run through
/// `sh -c` with the target passed as `$1`, so URIs are never spliced into
/// the command text. Permission answers come from the configured allow list
/// and are remembered for the lifetime of the broker.
pub struct DesktopBroker {
    handlers: HashMap<String, String>,
    granted: HashSet<String>,
    pictures_root: PathBuf,
    permissions: RefCell<HashMap<Capability, PermissionState>>,
    event_tx: mpsc::UnboundedSender<HostEvent>,
}

impl DesktopBroker {
    pub fn new(config: &Config, event_tx: mpsc::UnboundedSender<HostEvent>) -> Result<Self> {
        Ok(Self {
            handlers: config
                .handlers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
            granted: config
                .granted_capabilities
                .iter()
                .map(|c| c.to_ascii_lowercase())
                .collect(),
            pictures_root: config.pictures_root()?,
            permissions: RefCell::new(HashMap::new()),
            event_tx,
        })
    }

    fn handler_for(&self, descriptor: &ActionDescriptor) -> Option<&str> {
        let key = descriptor.routing_key()?;
        self.handlers.get(&key).map(String::as_str)
    }

    fn spawn_handler(&self, descriptor: &ActionDescriptor, target: &str) -> Result<Child> {
        let template = self
            .handler_for(descriptor)
            .with_context(|| format!("No handler registered for {}", descriptor))?;

        tracing::debug!("Running handler for {}: {}", descriptor, template);

        Command::new("sh")
            .arg("-c")
            .arg(template)
            .arg("sh")
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn handler for {}", descriptor))
    }
}

impl ActionBroker for DesktopBroker {
    fn resolve(&self, descriptor: &ActionDescriptor) -> bool {
        self.handler_for(descriptor).is_some()
    }

    fn invoke(&self, descriptor: &ActionDescriptor) -> Result<()> {
        let target = descriptor.uri.clone().unwrap_or_default();
        let child = self.spawn_handler(descriptor, &target)?;
        let label = descriptor.to_string();

        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) if !output.status.success() => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    tracing::warn!(
                        "[{}] Handler exited with {}: {}",
                        label,
                        output.status,
                        stderr.trim()
                    );
                }
                Ok(_) => tracing::debug!("[{}] Handler finished", label),
                Err(e) => tracing::warn!("[{}] Failed to wait on handler: {}", label, e),
            }
        });

        Ok(())
    }

    fn invoke_for_result(
        &self,
        descriptor: &ActionDescriptor,
        destination: &DestinationHandle,
    ) -> Result<()> {
        let path = destination_path(destination)?;
        let child = self.spawn_handler(descriptor, &path.to_string_lossy())?;
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let success = match child.wait_with_output().await {
                Ok(output) => {
                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        tracing::info!(
                            "Capture handler exited with {}: {}",
                            output.status,
                            stderr.trim()
                        );
                    }
                    output.status.success()
                }
                Err(e) => {
                    tracing::warn!("Failed to wait on capture handler: {}", e);
                    false
                }
            };

            let _ = event_tx.send(HostEvent::CaptureResult { success });
        });

        Ok(())
    }

    fn query_permission(&self, capability: Capability) -> PermissionState {
        self.permissions
            .borrow()
            .get(&capability)
            .copied()
            .unwrap_or(PermissionState::NotRequested)
    }

    fn request_permission(&self, capability: Capability) -> Result<()> {
        let granted = self.granted.contains(capability.as_str());
        let state = if granted {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };

        tracing::debug!("Permission request for {}: {:?}", capability.as_str(), state);
        self.permissions.borrow_mut().insert(capability, state);

        self.event_tx
            .send(HostEvent::PermissionResult {
                capability,
                granted,
            })
            .map_err(|e| anyhow::anyhow!("Failed to deliver permission result: {}", e))
    }

    fn create_destination(
        &self,
        kind: DestinationKind,
        metadata: &DestinationMetadata,
    ) -> Result<DestinationHandle> {
        let album = Path::new(&metadata.relative_path)
            .file_name()
            .with_context(|| format!("Invalid relative path: {}", metadata.relative_path))?;
        let dir = self.pictures_root.join(album);

        // Handles carry the path as a URI string
        if dir.to_str().is_none() {
            anyhow::bail!("Capture directory is not valid UTF-8: {:?}", dir);
        }

        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create capture directory: {:?}", dir))?;

        let display_name = Path::new(&metadata.display_name);
        let stem = display_name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "IMG".to_string());
        let suffix = match display_name.extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy()),
            None => extension_for(kind, &metadata.mime_type).to_string(),
        };

        let file = tempfile::Builder::new()
            .prefix(&format!("{}_", stem))
            .suffix(&suffix)
            .tempfile_in(&dir)
            .with_context(|| format!("Failed to create capture file in {:?}", dir))?;

        let uri = match file.path().to_str() {
            Some(path) => format!("{}{}", FILE_SCHEME, path),
            None => anyhow::bail!("Capture file path is not valid UTF-8: {:?}", file.path()),
        };

        let (_, path) = file
            .keep()
            .with_context(|| format!("Failed to keep capture file in {:?}", dir))?;

        tracing::debug!("Created capture destination {:?}", path);

        Ok(DestinationHandle { uri })
    }

    fn release_destination(&self, destination: &DestinationHandle) {
        let Ok(path) = destination_path(destination) else {
            return;
        };

        // Only an untouched placeholder is removed
        match std::fs::metadata(&path) {
            Ok(meta) if meta.len() == 0 => {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("Failed to remove {:?}: {}", path, e);
                }
            }
            Ok(_) => tracing::debug!("Keeping non-empty destination {:?}", path),
            Err(e) => tracing::debug!("Destination {:?} already gone: {}", path, e),
        }
    }
}

fn destination_path(destination: &DestinationHandle) -> Result<PathBuf> {
    destination
        .uri
        .strip_prefix(FILE_SCHEME)
        .map(PathBuf::from)
        .with_context(|| format!("Not a file destination: {}", destination.uri))
}

fn extension_for(kind: DestinationKind, mime_type: &str) -> &'static str {
    match (kind, mime_type) {
        (DestinationKind::Image, "image/png") => ".png",
        (DestinationKind::Image, _) => ".jpg",
    }
}
