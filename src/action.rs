use std::fmt;

/// A user action translated into something the host can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Capture,
    Dial,
    OpenUrl(String),
    OpenExternalApp {
        primary_target: String,
        fallback_url: String,
    },
}

impl ActionRequest {
    pub fn label(&self) -> &'static str {
        match self {
            ActionRequest::Capture => "capture",
            ActionRequest::Dial => "dial",
            ActionRequest::OpenUrl(_) => "open-url",
            ActionRequest::OpenExternalApp { .. } => "open-external-app",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    View,
    Dial,
    ImageCapture,
}

/// Host encoding of "what to do and with what data".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub uri: Option<String>,
}

impl ActionDescriptor {
    pub const CAPTURE_KEY: &'static str = "capture";

    pub fn view(uri: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::View,
            uri: Some(uri.into()),
        }
    }

    pub fn dial(uri: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Dial,
            uri: Some(uri.into()),
        }
    }

    pub fn image_capture() -> Self {
        Self {
            kind: ActionKind::ImageCapture,
            uri: None,
        }
    }

    /// Scheme of the URI, lowercased. `None` when there is no URI or no `:`.
    pub fn scheme(&self) -> Option<String> {
        let uri = self.uri.as_deref()?;
        let (scheme, _) = uri.split_once(':')?;
        if scheme.is_empty() {
            return None;
        }
        Some(scheme.to_ascii_lowercase())
    }

    /// Key a host uses to look up a handler for this descriptor.
    pub fn routing_key(&self) -> Option<String> {
        match self.kind {
            ActionKind::ImageCapture => Some(Self::CAPTURE_KEY.to_string()),
            ActionKind::View | ActionKind::Dial => self.scheme(),
        }
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uri {
            Some(uri) => write!(f, "{:?}({})", self.kind, uri),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

/// A sensitive permission gated by user consent on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Camera => "camera",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    NotRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Image,
}

/// Describes the writable target the host is asked to allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationMetadata {
    pub display_name: String,
    pub mime_type: String,
    pub relative_path: String,
}

impl DestinationMetadata {
    pub fn jpeg(timestamp_ms: u128, album: &str) -> Self {
        Self {
            display_name: format!("IMG_{}.jpg", timestamp_ms),
            mime_type: "image/jpeg".to_string(),
            relative_path: format!("Pictures/{}", album),
        }
    }
}

/// Opaque reference to a host-allocated writable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationHandle {
    pub uri: String,
}

/// What a single dispatch (or host continuation) produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success,
    HandlerMissing(String),
    PermissionDenied(String),
    PermissionRequestPending,
    DestinationCreationFailed(String),
    /// The capture handler has the destination; a result arrives later.
    CapturePending,
    /// A capture is already in flight.
    Busy(String),
}

impl DispatchOutcome {
    /// Message to show the user, if this outcome is a failure.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            DispatchOutcome::HandlerMissing(msg)
            | DispatchOutcome::PermissionDenied(msg)
            | DispatchOutcome::DestinationCreationFailed(msg)
            | DispatchOutcome::Busy(msg) => Some(msg),
            DispatchOutcome::Success
            | DispatchOutcome::PermissionRequestPending
            | DispatchOutcome::CapturePending => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_parsing() {
        assert_eq!(
            ActionDescriptor::view("https://chatgpt.com").scheme(),
            Some("https".to_string())
        );
        assert_eq!(
            ActionDescriptor::view("Instagram://feed").scheme(),
            Some("instagram".to_string())
        );
        assert_eq!(ActionDescriptor::dial("tel:").scheme(), Some("tel".to_string()));
        assert_eq!(ActionDescriptor::view("no-scheme").scheme(), None);
        assert_eq!(ActionDescriptor::view(":empty").scheme(), None);
    }

    #[test]
    fn test_routing_key() {
        assert_eq!(
            ActionDescriptor::image_capture().routing_key(),
            Some("capture".to_string())
        );
        assert_eq!(
            ActionDescriptor::dial("tel:123").routing_key(),
            Some("tel".to_string())
        );
    }

    #[test]
    fn test_jpeg_metadata() {
        let metadata = DestinationMetadata::jpeg(1700000000000, "ImplicitApp");
        assert_eq!(metadata.display_name, "IMG_1700000000000.jpg");
        assert_eq!(metadata.mime_type, "image/jpeg");
        assert_eq!(metadata.relative_path, "Pictures/ImplicitApp");
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            DispatchOutcome::HandlerMissing("Browser not found".into()).user_message(),
            Some("Browser not found")
        );
        assert_eq!(DispatchOutcome::Success.user_message(), None);
        assert_eq!(DispatchOutcome::CapturePending.user_message(), None);
    }
}
