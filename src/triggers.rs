use crate::messages::Trigger;
use anyhow::{Context, Result};
use std::io::BufRead;
use tokio::sync::mpsc;

/// Parse a button name into a trigger (e.g., "camera", "call", "link", "app")
pub fn parse_trigger(word: &str) -> Result<Trigger> {
    match word.trim().to_ascii_lowercase().as_str() {
        "camera" | "photo" => Ok(Trigger::Camera),
        "call" | "phone" | "dial" => Ok(Trigger::Call),
        "link" | "web" => Ok(Trigger::Link),
        "app" | "instagram" => Ok(Trigger::ExternalApp),
        other => Err(anyhow::anyhow!("Unknown trigger: {}", other)),
    }
}

/// Read button activations line by line and forward them on `tx`.
///
/// Blocking; run it off the runtime. Blank lines are skipped and unknown
/// words logged. Returns at EOF or once the receiving side is gone.
pub fn monitor_lines<R: BufRead>(reader: R, tx: mpsc::Sender<Trigger>) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("Failed to read trigger input")?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_trigger(&line) {
            Ok(trigger) => {
                tracing::debug!("Trigger activated: {:?}", trigger);
                if tx.blocking_send(trigger).is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("{} (expected camera, call, link or app)", e),
        }
    }

    tracing::debug!("Trigger input closed");
    Ok(())
}

/// Forward triggers typed on stdin from a dedicated thread.
///
/// A plain thread keeps the blocking read from holding up runtime shutdown.
pub fn spawn_stdin_monitor(tx: mpsc::Sender<Trigger>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        if let Err(e) = monitor_lines(stdin.lock(), tx) {
            tracing::error!("Trigger input failed: {}", e);
        }
    });
}
