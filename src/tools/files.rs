//! Tools that write into the workspace: plain text, notes, reminders and
//! HTML pages

use super::{param_or, required_param, str_param, Tool, ToolContext};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

fn file_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Keep a user title usable as a file name
pub fn sanitize_file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}

// ---------------------------------------------------------------------------
// saveToTxt
// ---------------------------------------------------------------------------

pub struct SaveToTxt;

#[async_trait]
impl Tool for SaveToTxt {
    fn name(&self) -> &'static str {
        "saveToTxt"
    }

    fn description(&self) -> &'static str {
        "Append a line of text to a file (filename, data)"
    }

    fn error_label(&self) -> &'static str {
        "Save error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let filename = required_param(params, "filename")?;
        let data = match params.get("data") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let path = ctx.workspace_file(filename)?;
        fs::create_dir_all(&ctx.workspace).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(format!("{}\n", data).as_bytes()).await?;
        file.flush().await?;

        debug!("💾 Appended {} bytes to {:?}", data.len() + 1, path);
        Ok(format!("Data saved to {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// createNote
// ---------------------------------------------------------------------------

pub struct CreateNote;

#[async_trait]
impl Tool for CreateNote {
    fn name(&self) -> &'static str {
        "createNote"
    }

    fn description(&self) -> &'static str {
        "Save a markdown note (title, content)"
    }

    fn error_label(&self) -> &'static str {
        "Note creation error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let title = param_or(params, "title", "Note");
        let content = str_param(params, "content").unwrap_or_default();

        fs::create_dir_all(&ctx.notes_dir).await?;
        let path = ctx
            .notes_dir
            .join(format!("{}_{}.md", sanitize_file_stem(&title), file_stamp()));

        let body = format!(
            "# {}\n\nCreated: {}\n\n{}",
            title,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            content
        );
        fs::write(&path, body).await?;

        Ok(format!("Note saved as {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// setReminder
// ---------------------------------------------------------------------------

/// One line of the reminders file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub message: String,
    pub time: String,
    pub created: String,
}

/// Append-only JSON-lines file. Each reminder is written with a single
/// `write_all` while holding the lock, so concurrent callers never interleave.
pub struct ReminderLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReminderLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, reminder: &Reminder) -> Result<()> {
        let mut line = serde_json::to_string(reminder)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Every stored reminder; malformed lines are skipped
    pub async fn read_all(&self) -> Result<Vec<Reminder>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

/// Delay described by phrases like "10 minutes" or "2 hours".
/// Anything else means five minutes.
pub fn parse_delay(time: &str) -> Result<Duration> {
    let lower = time.to_lowercase();
    let unit_minutes = lower.contains("minute") || lower.contains("min");
    let unit_hours = lower.contains("hour");
    if !unit_minutes && !unit_hours {
        return Ok(Duration::minutes(5));
    }

    let number = Regex::new(r"\d+")?;
    let Some(amount) = number.find(&lower) else {
        bail!("no number in time '{}'", time);
    };
    let amount: i64 = amount.as_str().parse()?;

    let delay = if unit_hours {
        Duration::try_hours(amount)
    } else {
        Duration::try_minutes(amount)
    };
    delay.ok_or_else(|| anyhow!("time '{}' is out of range", time))
}

pub struct SetReminder;

#[async_trait]
impl Tool for SetReminder {
    fn name(&self) -> &'static str {
        "setReminder"
    }

    fn description(&self) -> &'static str {
        "Store a reminder (message, time like '10 minutes')"
    }

    fn error_label(&self) -> &'static str {
        "Error setting reminder"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let message = param_or(params, "message", "Reminder");
        let delay = parse_delay(str_param(params, "time").unwrap_or_default())?;

        let now = Local::now();
        let at: DateTime<Local> = now
            .checked_add_signed(delay)
            .ok_or_else(|| anyhow!("reminder time is out of range"))?;
        let reminder = Reminder {
            message: message.clone(),
            time: at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            created: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        };
        ctx.reminders.append(&reminder).await?;

        Ok(format!(
            "Reminder set for {}: {}",
            at.format("%Y-%m-%d %H:%M:%S"),
            message
        ))
    }
}

// ---------------------------------------------------------------------------
// createHtml
// ---------------------------------------------------------------------------

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Full page around `content`. Content that already looks like markup is
/// embedded as-is, plain text is escaped into paragraphs.
pub fn render_page(title: &str, content: &str) -> String {
    let body = if content.trim_start().starts_with('<') {
        content.to_string()
    } else {
        content
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .map(|p| format!("<p>{}</p>", escape_html(p.trim())))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #0a0e1a; color: #e0f7ff; max-width: 860px; margin: 2rem auto; padding: 0 1rem; }}
h1 {{ color: #00d4ff; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

pub struct CreateHtml;

#[async_trait]
impl Tool for CreateHtml {
    fn name(&self) -> &'static str {
        "createHtml"
    }

    fn description(&self) -> &'static str {
        "Generate an HTML page (title, content, filename)"
    }

    fn error_label(&self) -> &'static str {
        "HTML creation error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let title = param_or(params, "title", "JARVIS Page");
        let content = str_param(params, "content").unwrap_or_default();
        let stem = match str_param(params, "filename") {
            Some(name) => sanitize_file_stem(name.trim_end_matches(".html")),
            None => format!("page_{}", file_stamp()),
        };

        fs::create_dir_all(&ctx.pages_dir).await?;
        let path = ctx.pages_dir.join(format!("{}.html", stem));
        fs::write(&path, render_page(&title, content)).await?;

        Ok(format!("HTML page saved as {}", path.display()))
    }
}
