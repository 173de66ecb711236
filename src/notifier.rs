use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Short, transient user-visible message channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Sends desktop notifications through `notify-send`.
///
/// Prints to stdout when desktop notifications are disabled, or when the
/// notification program is missing or fails.
pub struct DesktopNotifier {
    app_name: String,
    desktop_notifications: bool,
    program: String,
}

impl DesktopNotifier {
    pub fn new(app_name: &str, desktop_notifications: bool) -> Self {
        Self {
            app_name: app_name.to_owned(),
            desktop_notifications,
            program: "notify-send".to_string(),
        }
    }

    /// Use a different `notify-send` compatible program
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_owned();
        self
    }

    fn console_line(&self, message: &str) -> String {
        format!("[{}] {}", self.app_name, message)
    }

    async fn send_desktop(&self, message: &str) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--expire-time=2000")
            .arg(&self.app_name)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        tracing::info!("Notify: {}", message);

        if self.desktop_notifications {
            match self.send_desktop(message).await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!("Desktop notification failed, printing instead: {:#}", e),
            }
        }

        println!("{}", self.console_line(message));
        Ok(())
    }
}
