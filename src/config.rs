use crate::action::ActionDescriptor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_web_url")]
    pub web_url: String,

    #[serde(default = "default_external_app_target")]
    pub external_app_target: String,

    #[serde(default = "default_external_app_fallback")]
    pub external_app_fallback: String,

    #[serde(default = "default_dial_uri")]
    pub dial_uri: String,

    /// Root for captured images; `$HOME/Pictures` when unset
    #[serde(default)]
    pub pictures_dir: Option<PathBuf>,

    #[serde(default = "default_capture_album")]
    pub capture_album: String,

    /// Shell templates keyed by URI scheme (or `capture`); `$1` is the target
    #[serde(default = "default_handlers")]
    pub handlers: HashMap<String, String>,

    #[serde(default = "default_granted_capabilities")]
    pub granted_capabilities: Vec<String>,

    #[serde(default = "default_desktop_notifications")]
    pub desktop_notifications: bool,

    /// `notify-send` compatible program used for desktop notifications
    #[serde(default = "default_notify_program")]
    pub notify_program: String,

    #[serde(default)]
    pub messages: Messages,
}

/// User-facing notification text
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Messages {
    pub browser_not_found: String,
    pub dialer_not_found: String,
    pub external_app_not_found: String,
    pub camera_not_found: String,
    pub permission_denied: String,
    pub destination_failed: String,
    pub capture_busy: String,
    pub capture_saved: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            browser_not_found: "Browser not found".to_string(),
            dialer_not_found: "Dialer not found".to_string(),
            external_app_not_found: "Failed to open Instagram.".to_string(),
            camera_not_found: "Camera app not found".to_string(),
            permission_denied: "Camera permission denied".to_string(),
            destination_failed: "Failed to create image URI".to_string(),
            capture_busy: "A photo is already being taken".to_string(),
            capture_saved: "Photo saved to gallery".to_string(),
        }
    }
}

fn default_app_name() -> String {
    "Implicit Launcher".to_string()
}

fn default_web_url() -> String {
    "https://chatgpt.com".to_string()
}

fn default_external_app_target() -> String {
    "instagram://feed".to_string()
}

fn default_external_app_fallback() -> String {
    "https://www.instagram.com/".to_string()
}

fn default_dial_uri() -> String {
    "tel:".to_string()
}

fn default_capture_album() -> String {
    "ImplicitApp".to_string()
}

fn default_handlers() -> HashMap<String, String> {
    HashMap::from([
        ("http".to_string(), r#"xdg-open "$1""#.to_string()),
        ("https".to_string(), r#"xdg-open "$1""#.to_string()),
        ("tel".to_string(), r#"xdg-open "$1""#.to_string()),
        (
            "capture".to_string(),
            r#"ffmpeg -loglevel error -y -f v4l2 -i /dev/video0 -frames:v 1 "$1""#.to_string(),
        ),
    ])
}

fn default_granted_capabilities() -> Vec<String> {
    vec!["camera".to_string()]
}

fn default_desktop_notifications() -> bool {
    true
}

fn default_notify_program() -> String {
    "notify-send".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            web_url: default_web_url(),
            external_app_target: default_external_app_target(),
            external_app_fallback: default_external_app_fallback(),
            dial_uri: default_dial_uri(),
            pictures_dir: None,
            capture_album: default_capture_album(),
            handlers: default_handlers(),
            granted_capabilities: default_granted_capabilities(),
            desktop_notifications: default_desktop_notifications(),
            notify_program: default_notify_program(),
            messages: Messages::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/implicit-launcher/config.json)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`, writing a default config there first if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("implicit-launcher").join("config.json"))
    }

    /// Root that capture albums are created under
    pub fn pictures_root(&self) -> Result<PathBuf> {
        match &self.pictures_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let home = std::env::var("HOME").context("HOME environment variable not set")?;
                Ok(PathBuf::from(home).join("Pictures"))
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.web_url.is_empty() {
            return Err(anyhow::anyhow!("web_url cannot be empty"));
        }

        if self.external_app_target.is_empty() || self.external_app_fallback.is_empty() {
            return Err(anyhow::anyhow!(
                "external_app_target and external_app_fallback cannot be empty"
            ));
        }

        if ActionDescriptor::dial(self.dial_uri.as_str()).scheme().is_none() {
            return Err(anyhow::anyhow!(
                "dial_uri must carry a scheme, e.g. \"tel:\""
            ));
        }

        if self.capture_album.is_empty() || self.capture_album.contains('/') {
            return Err(anyhow::anyhow!(
                "capture_album must be a single directory name"
            ));
        }

        if !self.handlers.contains_key("capture") {
            return Err(anyhow::anyhow!("handlers must define a \"capture\" command"));
        }

        Ok(())
    }
}
