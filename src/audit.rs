use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

const ACTIVITY_LOG: &str = "activity.log";

/// Directory holding the activity log (respecting XDG)
pub fn log_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("jarvis-bridge")
}

/// Append an entry to `activity.log` in `dir`
pub fn log(dir: &Path, entry: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(ACTIVITY_LOG))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        entry
    )?;
    Ok(())
}

/// Record a tool run. Failures only produce a warning.
pub fn log_tool_call(dir: &Path, tool: &str, is_error: bool) {
    let outcome = if is_error { "ERROR" } else { "OK" };
    if let Err(e) = log(dir, &format!("TOOL {} | {}", tool, outcome)) {
        warn!("⚠️ Could not write activity log: {}", e);
    }
}

/// Record a session lifecycle event
pub fn log_session(dir: &Path, event: &str) {
    if let Err(e) = log(dir, &format!("SESSION {}", event)) {
        warn!("⚠️ Could not write activity log: {}", e);
    }
}
