use crate::error::{BridgeError, BridgeResult};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base URLs of every external service the tools and the agent talk to.
///
/// Overridable so tests can point them at a local mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub elevenlabs_api: String,
    pub elevenlabs_ws: String,
    pub duckduckgo: String,
    pub wikipedia: String,
    pub nominatim: String,
    pub openweather: String,
    pub translate: String,
    pub yahoo_finance: String,
    pub news_feeds: String,
    pub openai: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            elevenlabs_api: "https://api.elevenlabs.io".to_string(),
            elevenlabs_ws: "wss://api.elevenlabs.io".to_string(),
            duckduckgo: "https://api.duckduckgo.com".to_string(),
            wikipedia: "https://en.wikipedia.org".to_string(),
            nominatim: "https://nominatim.openstreetmap.org".to_string(),
            openweather: "https://api.openweathermap.org".to_string(),
            translate: "https://translate.googleapis.com".to_string(),
            yahoo_finance: "https://query1.finance.yahoo.com".to_string(),
            news_feeds: "https://feeds.bbci.co.uk/news".to_string(),
            openai: "https://api.openai.com".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Servers
    pub http_host: String,
    pub http_port: u16,
    pub ws_host: String,
    pub ws_port: u16,
    pub ui_dir: String,
    pub static_dir: String,
    pub open_browser: bool,

    // Bridge
    pub event_queue_capacity: usize,
    pub client_buffer: usize,

    // Agent
    pub requires_auth: bool,
    pub audio_enabled: bool,
    pub demo_delay_ms: u64,

    // Tools
    pub workspace_dir: String,
    pub reminders_file: String,
    pub notes_dir: String,
    pub images_dir: String,
    pub pages_dir: String,
    pub command_timeout: u64,
    pub http_timeout: u64,
    pub smtp_host: String,
    pub smtp_port: u16,

    // Meta
    pub log_level: String,
    pub endpoints: Endpoints,

    // Secrets (environment only)
    #[serde(skip)]
    pub agent_id: Option<String>,
    #[serde(skip)]
    pub elevenlabs_api_key: Option<String>,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    #[serde(skip)]
    pub openweather_api_key: Option<String>,
    #[serde(skip)]
    pub email_address: Option<String>,
    #[serde(skip)]
    pub email_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_host: "127.0.0.1".to_string(),
            http_port: 5000,
            ws_host: "127.0.0.1".to_string(),
            ws_port: 8765,
            ui_dir: "templates".to_string(),
            static_dir: "static".to_string(),
            open_browser: true,
            event_queue_capacity: 1024,
            client_buffer: 256,
            requires_auth: true,
            audio_enabled: true,
            demo_delay_ms: 1000,
            workspace_dir: ".".to_string(),
            reminders_file: "reminders.json".to_string(),
            notes_dir: "notes".to_string(),
            images_dir: "generated_images".to_string(),
            pages_dir: "generated_pages".to_string(),
            command_timeout: 5,
            http_timeout: 10,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            log_level: "info".to_string(),
            endpoints: Endpoints::default(),
            agent_id: None,
            elevenlabs_api_key: None,
            openai_api_key: None,
            openweather_api_key: None,
            email_address: None,
            email_password: None,
        }
    }
}

impl Config {
    /// Load config from file or fall back to defaults, then apply secrets
    /// from the environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from an explicit path without touching the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // Graceful degradation: log warning and use defaults
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    /// Save config to an explicit path. Secrets are never written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill the secret fields from environment variables
    pub fn apply_env(&mut self) {
        self.agent_id = env_secret("AGENT_ID");
        self.elevenlabs_api_key = env_secret("ELEVENLABS_API_KEY");
        self.openai_api_key = env_secret("OPENAI_API_KEY");
        self.openweather_api_key = env_secret("OPENWEATHER_API_KEY");
        self.email_address = env_secret("EMAIL_ADDRESS");
        self.email_password = env_secret("EMAIL_PASSWORD");
    }

    /// Agent id and API key, when both are configured
    pub fn voice_credentials(&self) -> Option<(String, String)> {
        match (&self.agent_id, &self.elevenlabs_api_key) {
            (Some(agent), Some(key)) => Some((agent.clone(), key.clone())),
            _ => None,
        }
    }

    pub fn workspace(&self) -> PathBuf {
        PathBuf::from(&self.workspace_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        PathBuf::from(&self.ui_dir).join("index.html")
    }

    pub fn http_url(&self) -> String {
        format!("http://{}:{}", self.http_host, self.http_port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}", self.ws_host, self.ws_port)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    /// Reject settings the bridge cannot start with
    pub fn validate(&self) -> BridgeResult<()> {
        if self.event_queue_capacity == 0 {
            return Err(BridgeError::Config("event_queue_capacity must be at least 1".to_string()));
        }
        if self.client_buffer == 0 {
            return Err(BridgeError::Config("client_buffer must be at least 1".to_string()));
        }
        if self.http_port != 0 && self.http_port == self.ws_port && self.http_host == self.ws_host {
            return Err(BridgeError::Config(format!(
                "HTTP and WebSocket servers both use port {}",
                self.http_port
            )));
        }
        Ok(())
    }
}

fn env_secret(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("JARVIS_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jarvis-bridge")
        .join("config.json")
}
