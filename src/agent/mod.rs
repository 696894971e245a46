//! Voice Agent Module
//!
//! A voice agent owns the conversation with the speech backend. Everything
//! it hears or says is reported through an [`EventSink`], so the agent never
//! needs to know which UI clients are connected.

use crate::audio;
use crate::bridge::queue::EventSink;
use crate::config::Config;
use crate::error::BridgeResult;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod demo;
pub mod elevenlabs;
pub mod protocol;

pub use demo::DemoAgent;
pub use elevenlabs::ElevenLabsAgent;

/// Trait for conversational voice backends
#[async_trait]
pub trait VoiceAgent: Send + Sync {
    /// Open a session. Starting an active session is a no-op.
    async fn start(&self, sink: EventSink) -> BridgeResult<()>;

    /// Close the session. Safe to call when idle.
    async fn stop(&self);

    /// Send a typed user message into the conversation
    async fn send_text(&self, text: &str) -> BridgeResult<()>;

    fn is_active(&self) -> bool;

    /// Whether this agent talks to a real voice backend
    fn is_voice(&self) -> bool;

    fn name(&self) -> &str;
}

/// Factory for the configured agent: ElevenLabs when credentials are
/// present, otherwise the demo agent.
pub fn create_agent(
    config: &Config,
    tools: Arc<ToolRegistry>,
    force_demo: bool,
) -> BridgeResult<Arc<dyn VoiceAgent>> {
    let demo_delay = Duration::from_millis(config.demo_delay_ms);

    let agent: Arc<dyn VoiceAgent> = match (force_demo, config.voice_credentials()) {
        (false, Some((agent_id, api_key))) => {
            info!("🛠️ Creating voice agent: ElevenLabs (agent {})", agent_id);
            let audio = audio::create_audio(config.audio_enabled);
            info!("  - Audio interface: {}", audio.name());
            Arc::new(ElevenLabsAgent::new(config, agent_id, api_key, tools, audio)?)
        }
        (true, _) => {
            info!("🛠️ Creating voice agent: demo (forced)");
            Arc::new(DemoAgent::new(demo_delay))
        }
        (false, None) => {
            warn!("⚠️ AGENT_ID or ELEVENLABS_API_KEY missing, running in demo mode");
            Arc::new(DemoAgent::new(demo_delay))
        }
    };

    info!("✅ Voice agent '{}' initialized", agent.name());
    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolContext;

    fn tools() -> (tempfile::TempDir, Arc<ToolRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::with_defaults(ToolContext::for_workspace(dir.path()));
        (dir, Arc::new(registry))
    }

    #[test]
    fn test_factory_without_credentials_is_demo() {
        let (_dir, tools) = tools();
        let agent = create_agent(&Config::default(), tools, false).unwrap();
        assert!(!agent.is_voice());
        assert_eq!(agent.name(), "demo");
    }

    #[test]
    fn test_factory_with_credentials_is_voice() {
        let (_dir, tools) = tools();
        let mut config = Config::default();
        config.audio_enabled = false;
        config.agent_id = Some("agent_123".to_string());
        config.elevenlabs_api_key = Some("key".to_string());

        let agent = create_agent(&config, Arc::clone(&tools), false).unwrap();
        assert!(agent.is_voice());
        assert!(!agent.is_active());

        let forced = create_agent(&config, tools, true).unwrap();
        assert!(!forced.is_voice());
    }
}
