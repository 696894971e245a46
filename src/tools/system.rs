//! Host tools: resource report, whitelisted commands and screenshots

use super::{str_param, Tool, ToolContext};
use crate::system::SystemSnapshot;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Programs `runCommand` may start
pub const SAFE_COMMANDS: &[&str] = &["ls", "dir", "pwd", "date", "time", "whoami", "hostname"];

pub struct GetSystemInfo;

#[async_trait]
impl Tool for GetSystemInfo {
    fn name(&self) -> &'static str {
        "getSystemInfo"
    }

    fn description(&self) -> &'static str {
        "CPU, memory, disk and network usage"
    }

    fn error_label(&self) -> &'static str {
        "System info error"
    }

    async fn call(&self, _params: &Value, _ctx: &ToolContext) -> Result<String> {
        let snapshot = tokio::task::spawn_blocking(SystemSnapshot::capture).await?;
        Ok(snapshot.to_report())
    }
}

/// Split a command line into program and arguments when the program is on
/// the whitelist. No shell is involved, so separators and redirections are
/// passed through as plain arguments.
pub fn parse_safe_command(line: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = line.split_whitespace();
    let program = parts.next()?;
    if !SAFE_COMMANDS.contains(&program) {
        return None;
    }
    Some((program, parts.collect()))
}

pub struct RunCommand;

#[async_trait]
impl Tool for RunCommand {
    fn name(&self) -> &'static str {
        "runCommand"
    }

    fn description(&self) -> &'static str {
        "Run a whitelisted command such as ls, pwd or date (command)"
    }

    fn error_label(&self) -> &'static str {
        "Command error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let line = str_param(params, "command").unwrap_or_default();
        let Some((program, args)) = parse_safe_command(line) else {
            return Ok("Command not in safe list".to_string());
        };

        let child = Command::new(program)
            .args(&args)
            .current_dir(&ctx.workspace)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(ctx.command_timeout, child).await {
            Ok(result) => result?,
            Err(_) => return Ok("Command timed out".to_string()),
        };

        debug!("⚙️ {} exited with {}", program, output.status);
        Ok(format!(
            "Command output:\n{}",
            String::from_utf8_lossy(&output.stdout)
        ))
    }
}

/// (program, arguments placed before the output path)
const SCREENSHOT_UTILITIES: &[(&str, &[&str])] = &[
    ("grim", &[]),
    ("gnome-screenshot", &["-f"]),
    ("spectacle", &["-b", "-n", "-o"]),
    ("scrot", &["-o"]),
    ("import", &["-window", "root"]),
    ("screencapture", &["-x"]),
];

async fn capture_screen(path: &Path, timeout: Duration) -> Result<&'static str> {
    for (program, args) in SCREENSHOT_UTILITIES {
        let child = Command::new(program)
            .args(*args)
            .arg(path)
            .kill_on_drop(true)
            .status();
        let Ok(status) = tokio::time::timeout(timeout, child).await else {
            debug!("{} timed out", program);
            continue;
        };
        match status {
            Ok(s) if s.success() && path.exists() => return Ok(*program),
            Ok(s) => debug!("{} exited with {}", program, s),
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => debug!("{} failed: {}", program, e),
        }
    }
    bail!("no screenshot utility available")
}

pub struct TakeScreenshot;

#[async_trait]
impl Tool for TakeScreenshot {
    fn name(&self) -> &'static str {
        "takeScreenshot"
    }

    fn description(&self) -> &'static str {
        "Capture the screen to a PNG (filename)"
    }

    fn error_label(&self) -> &'static str {
        "Screenshot error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let default_name = format!(
            "screenshot_{}.png",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let name = str_param(params, "filename").unwrap_or(&default_name);
        let path = ctx.workspace_file(name)?;
        tokio::fs::create_dir_all(&ctx.workspace).await?;

        let utility = capture_screen(&path, ctx.command_timeout).await?;
        debug!("📸 Captured with {}", utility);
        Ok(format!("Screenshot saved as {}", path.display()))
    }
}
