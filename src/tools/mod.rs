//! Client Tools
//!
//! Flat dispatch table of tools the voice agent (or the UI) can invoke.
//! Every tool answers with a human-readable string; failures are turned into
//! strings prefixed with the tool's error label, so a tool call can never
//! take the session down.

use crate::config::{Config, Endpoints};
use crate::error::BridgeResult;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub mod email;
pub mod files;
pub mod home;
pub mod image;
pub mod math;
pub mod qr;
pub mod system;
pub mod weather;
pub mod web;

pub use files::{Reminder, ReminderLog};

const USER_AGENT: &str = concat!("jarvis-bridge/", env!("CARGO_PKG_VERSION"));

/// A single callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the agent uses to call the tool
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Prefix for error strings, e.g. "Weather API error"
    fn error_label(&self) -> &'static str;

    async fn call(&self, params: &Value, ctx: &ToolContext) -> anyhow::Result<String>;
}

/// SMTP account used by `sendEmail`
#[derive(Debug, Clone)]
pub struct EmailAccount {
    pub address: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

/// Everything tools need from the outside world
pub struct ToolContext {
    pub http: reqwest::Client,
    pub workspace: PathBuf,
    pub notes_dir: PathBuf,
    pub images_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub endpoints: Endpoints,
    pub command_timeout: Duration,
    pub openweather_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub email: Option<EmailAccount>,
    pub reminders: ReminderLog,
    /// Directory of the activity log, `None` disables it
    pub activity_dir: Option<PathBuf>,
}

impl ToolContext {
    pub fn from_config(config: &Config) -> BridgeResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout())
            .build()?;

        let mut ctx = Self::build(config, http);
        ctx.activity_dir = Some(crate::audit::log_dir());
        Ok(ctx)
    }

    /// Context rooted at `workspace` with default endpoints, no secrets and
    /// no activity log
    pub fn for_workspace(workspace: &Path) -> Self {
        let mut config = Config::default();
        config.workspace_dir = workspace.to_string_lossy().into_owned();
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_default();
        Self::build(&config, http)
    }

    fn build(config: &Config, http: reqwest::Client) -> Self {
        let workspace = config.workspace();
        let email = match (&config.email_address, &config.email_password) {
            (Some(address), Some(password)) => Some(EmailAccount {
                address: address.clone(),
                password: password.clone(),
                host: config.smtp_host.clone(),
                port: config.smtp_port,
            }),
            _ => None,
        };

        Self {
            http,
            notes_dir: workspace.join(&config.notes_dir),
            images_dir: workspace.join(&config.images_dir),
            pages_dir: workspace.join(&config.pages_dir),
            reminders: ReminderLog::new(workspace.join(&config.reminders_file)),
            workspace,
            endpoints: config.endpoints.clone(),
            command_timeout: Duration::from_secs(config.command_timeout),
            openweather_api_key: config.openweather_api_key.clone(),
            openai_api_key: config.openai_api_key.clone(),
            email,
            activity_dir: None,
        }
    }

    /// Resolve a user-supplied file name inside the workspace. Only the final
    /// path component is kept.
    pub fn workspace_file(&self, name: &str) -> anyhow::Result<PathBuf> {
        let file_name = Path::new(name.trim())
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("invalid file name '{}'", name))?;
        Ok(self.workspace.join(file_name))
    }
}

/// Result of one tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool: String,
    pub output: String,
    pub is_error: bool,
}

/// Name → tool lookup plus the shared context
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
    ctx: ToolContext,
}

impl ToolRegistry {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            tools: HashMap::new(),
            ctx,
        }
    }

    /// Registry with every built-in tool
    pub fn with_defaults(ctx: ToolContext) -> Self {
        let mut registry = Self::new(ctx);
        registry.register(Arc::new(web::SearchWeb));
        registry.register(Arc::new(files::SaveToTxt));
        registry.register(Arc::new(weather::GetWeather));
        registry.register(Arc::new(web::TranslateText));
        registry.register(Arc::new(web::GetNews));
        registry.register(Arc::new(files::SetReminder));
        registry.register(Arc::new(system::GetSystemInfo));
        registry.register(Arc::new(math::CalculateMath));
        registry.register(Arc::new(system::TakeScreenshot));
        registry.register(Arc::new(web::SearchWikipedia));
        registry.register(Arc::new(web::GetCryptoPrice));
        registry.register(Arc::new(home::ControlSmartHome));
        registry.register(Arc::new(qr::GenerateQrCode));
        registry.register(Arc::new(email::SendEmail));
        registry.register(Arc::new(system::RunCommand));
        registry.register(Arc::new(files::CreateNote));
        registry.register(Arc::new(image::AnalyzeImage));
        registry.register(Arc::new(image::GenerateImage));
        registry.register(Arc::new(files::CreateHtml));
        info!("🧰 Registered {} tools", registry.tools.len());
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.tools.insert(tool.name(), tool).is_some() {
            warn!("⚠️ Tool registered twice, keeping the newest");
        }
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Map a UI shortcut or exact tool name to the registered name
    pub fn resolve(&self, name: &str) -> Option<&'static str> {
        let key = name.trim();
        if let Some((registered, _)) = self.tools.get_key_value(key) {
            return Some(*registered);
        }
        let alias = match key.to_lowercase().as_str() {
            "search" | "web" => "searchWeb",
            "save" | "txt" => "saveToTxt",
            "weather" => "getWeather",
            "translate" => "translateText",
            "news" => "getNews",
            "reminder" | "remind" => "setReminder",
            "system" | "sysinfo" => "getSystemInfo",
            "math" | "calculate" | "calc" => "calculateMath",
            "screenshot" => "takeScreenshot",
            "wiki" | "wikipedia" => "searchWikipedia",
            "crypto" => "getCryptoPrice",
            "home" | "smarthome" => "controlSmartHome",
            "qr" | "qrcode" => "generateQRCode",
            "email" | "mail" => "sendEmail",
            "command" | "cmd" => "runCommand",
            "note" | "notes" => "createNote",
            "analyze" => "analyzeImage",
            "image" => "generateImage",
            "html" => "createHtml",
            _ => return None,
        };
        self.tools.get_key_value(alias).map(|(registered, _)| *registered)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// (name, description) pairs, sorted by name
    pub fn descriptions(&self) -> Vec<(&'static str, &'static str)> {
        let mut items: Vec<_> = self
            .tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect();
        items.sort_unstable();
        items
    }

    /// Run a tool. Never fails: every problem ends up in the outcome text.
    pub async fn execute(&self, name: &str, params: &Value) -> ToolOutcome {
        let Some(tool) = self.resolve(name).and_then(|n| self.tools.get(n)).cloned() else {
            warn!("❓ Unknown tool requested: {}", name);
            return self.finish(name, format!("Unknown tool: {}", name), true);
        };

        info!("🔧 Running tool {}", tool.name());
        debug!("  - parameters: {}", params);

        let result = AssertUnwindSafe(tool.call(params, &self.ctx))
            .catch_unwind()
            .await;

        let (output, is_error) = match result {
            Ok(Ok(text)) => (text, false),
            Ok(Err(e)) => {
                warn!("❌ Tool {} failed: {:#}", tool.name(), e);
                (format!("{}: {:#}", tool.error_label(), e), true)
            }
            Err(panic) => {
                error!("💥 Tool {} panicked: {}", tool.name(), panic_message(&panic));
                (format!("{}: tool crashed", tool.error_label()), true)
            }
        };

        self.finish(tool.name(), output, is_error)
    }

    fn finish(&self, tool: &str, output: String, is_error: bool) -> ToolOutcome {
        if let Some(dir) = &self.ctx.activity_dir {
            crate::audit::log_tool_call(dir, tool, is_error);
        }
        ToolOutcome {
            tool: tool.to_string(),
            output,
            is_error,
        }
    }
}

/// Message shown in the UI when a tool button is pressed
pub fn activation_message(tool: &str) -> String {
    match tool {
        "search" => "Searching the web...".to_string(),
        "image" => "Preparing to generate image...".to_string(),
        "save" => "Ready to save data...".to_string(),
        "html" => "HTML generator ready...".to_string(),
        "weather" => "Fetching weather information...".to_string(),
        "translate" => "Translation service ready...".to_string(),
        other => format!("{} tool activated", other),
    }
}

/// String parameter, trimmed, `None` when absent or blank
pub(crate) fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// String parameter with a fallback
pub(crate) fn param_or(params: &Value, key: &str, default: &str) -> String {
    str_param(params, key).unwrap_or(default).to_string()
}

/// Required string parameter
pub(crate) fn required_param<'a>(params: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    str_param(params, key).ok_or_else(|| anyhow::anyhow!("missing '{}' parameter", key))
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Exploding;

    #[async_trait]
    impl Tool for Exploding {
        fn name(&self) -> &'static str {
            "explode"
        }
        fn description(&self) -> &'static str {
            "Always panics"
        }
        fn error_label(&self) -> &'static str {
            "Explosion error"
        }
        async fn call(&self, _params: &Value, _ctx: &ToolContext) -> anyhow::Result<String> {
            panic!("kaboom");
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &'static str {
            "fail"
        }
        fn description(&self) -> &'static str {
            "Always errors"
        }
        fn error_label(&self) -> &'static str {
            "Failure error"
        }
        async fn call(&self, _params: &Value, _ctx: &ToolContext) -> anyhow::Result<String> {
            anyhow::bail!("upstream said no")
        }
    }

    fn registry() -> (tempfile::TempDir, ToolRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::with_defaults(ToolContext::for_workspace(dir.path()));
        (dir, registry)
    }

    #[test]
    fn test_default_registry_has_all_tools() {
        let (_dir, registry) = registry();
        assert_eq!(registry.names().len(), 19);
        for name in ["searchWeb", "saveToTxt", "generateQRCode", "createHtml", "generateImage"] {
            assert!(registry.names().contains(&name), "missing {}", name);
        }
    }

    #[test]
    fn test_resolve_aliases() {
        let (_dir, registry) = registry();
        assert_eq!(registry.resolve("search"), Some("searchWeb"));
        assert_eq!(registry.resolve("weather"), Some("getWeather"));
        assert_eq!(registry.resolve("image"), Some("generateImage"));
        assert_eq!(registry.resolve("calculateMath"), Some("calculateMath"));
        assert_eq!(registry.resolve("teleport"), None);
    }

    #[test]
    fn test_activation_messages() {
        assert_eq!(activation_message("search"), "Searching the web...");
        assert_eq!(activation_message("html"), "HTML generator ready...");
        assert_eq!(activation_message("laser"), "laser tool activated");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_outcome() {
        let (_dir, registry) = registry();
        let outcome = registry.execute("teleport", &json!({})).await;
        assert!(outcome.is_error);
        assert_eq!(outcome.output, "Unknown tool: teleport");
    }

    #[tokio::test]
    async fn test_errors_are_prefixed_with_label() {
        let (_dir, mut registry) = registry();
        registry.register(Arc::new(Failing));
        let outcome = registry.execute("fail", &json!({})).await;
        assert!(outcome.is_error);
        assert_eq!(outcome.output, "Failure error: upstream said no");
    }

    #[tokio::test]
    async fn test_panics_are_contained() {
        let (_dir, mut registry) = registry();
        registry.register(Arc::new(Exploding));
        let outcome = registry.execute("explode", &json!({})).await;
        assert!(outcome.is_error);
        assert_eq!(outcome.output, "Explosion error: tool crashed");
    }

    #[test]
    fn test_workspace_file_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::for_workspace(dir.path());
        assert_eq!(
            ctx.workspace_file("../../etc/passwd").unwrap(),
            dir.path().join("passwd")
        );
        assert!(ctx.workspace_file("..").is_err());
        assert!(ctx.workspace_file("  ").is_err());
    }

    #[test]
    fn test_param_helpers() {
        let params = json!({"a": "  x ", "b": "", "c": 3});
        assert_eq!(str_param(&params, "a"), Some("x"));
        assert_eq!(str_param(&params, "b"), None);
        assert_eq!(str_param(&params, "c"), None);
        assert_eq!(param_or(&params, "b", "dflt"), "dflt");
        assert!(required_param(&params, "missing").is_err());
    }
}
