//! Bridge Controller
//!
//! Routes UI actions to the voice agent and the tool registry. Replies meant
//! for the requesting client go straight to it through the hub; everything
//! else is enqueued on the event sink so it reaches all clients in order.

use super::hub::{ClientHub, ClientId};
use super::messages::{ClientAction, ServerEvent};
use super::queue::EventSink;
use crate::agent::{demo, VoiceAgent};
use crate::tools::{activation_message, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const VOICE_ACTIVE: &str = "🎤 Voice Active - Speak Now!";
pub const DEMO_MODE: &str = "Demo Mode";
pub const STOPPED: &str = "Stopped";

pub struct Controller {
    agent: Arc<dyn VoiceAgent>,
    tools: Arc<ToolRegistry>,
    hub: Arc<ClientHub>,
    sink: EventSink,
    demo_delay: Duration,
}

impl Controller {
    pub fn new(
        agent: Arc<dyn VoiceAgent>,
        tools: Arc<ToolRegistry>,
        hub: Arc<ClientHub>,
        sink: EventSink,
        demo_delay: Duration,
    ) -> Self {
        Self {
            agent,
            tools,
            hub,
            sink,
            demo_delay,
        }
    }

    pub fn hub(&self) -> &Arc<ClientHub> {
        &self.hub
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn voice_enabled(&self) -> bool {
        self.agent.is_voice()
    }

    /// Greeting for a freshly connected client
    pub fn connection_event(&self) -> ServerEvent {
        let voice = self.voice_enabled();
        ServerEvent::connection(voice, !voice)
    }

    /// Parse a raw text frame and act on it. Parse errors are reported to
    /// the sender only.
    pub async fn handle_raw(&self, client: ClientId, raw: &str) {
        match ClientAction::parse(raw) {
            Ok(action) => self.handle(client, action).await,
            Err(e) => {
                debug!("Client {} sent a bad frame: {}", client, e);
                self.reply(client, ServerEvent::error(e.to_string())).await;
            }
        }
    }

    pub async fn handle(&self, client: ClientId, action: ClientAction) {
        match action {
            ClientAction::StartListening => self.start_listening(client).await,
            ClientAction::StopListening => self.stop_listening(client).await,
            ClientAction::UseTool { tool, parameters } => self.use_tool(&tool, parameters),
            ClientAction::SendMessage { text } => self.send_message(client, &text).await,
        }
    }

    async fn start_listening(&self, client: ClientId) {
        if !self.agent.is_voice() {
            info!("🎭 Starting demo conversation for client {}", client);
            self.reply(client, ServerEvent::status(DEMO_MODE, true)).await;
            if let Err(e) = self.agent.start(self.sink.clone()).await {
                warn!("❌ Demo session failed: {}", e);
            }
            return;
        }

        match self.agent.start(self.sink.clone()).await {
            Ok(()) => {
                self.reply(client, ServerEvent::status(VOICE_ACTIVE, true)).await;
            }
            Err(e) => {
                error!("❌ Failed to start voice session: {}", e);
                self.reply(client, ServerEvent::error("Voice session failed")).await;
            }
        }
    }

    async fn stop_listening(&self, client: ClientId) {
        self.agent.stop().await;
        self.reply(client, ServerEvent::status(STOPPED, false)).await;
    }

    fn use_tool(&self, tool: &str, parameters: Option<Value>) {
        info!("🔧 Tool selected: {}", tool);
        self.sink
            .emit(ServerEvent::tool_activation(tool, activation_message(tool)));

        let Some(params) = parameters else {
            return;
        };
        let Some(name) = self.tools.resolve(tool) else {
            debug!("No registered tool behind '{}', activation only", tool);
            return;
        };

        let tools = Arc::clone(&self.tools);
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let outcome = tools.execute(name, &params).await;
            sink.tool_result(outcome.tool, outcome.output, outcome.is_error);
        });
    }

    async fn send_message(&self, client: ClientId, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.reply(client, ServerEvent::error("Message text is empty")).await;
            return;
        }

        if self.agent.is_active() {
            if let Err(e) = self.agent.send_text(text).await {
                warn!("❌ Failed to forward message: {}", e);
                self.reply(client, ServerEvent::error("Voice session not active")).await;
                return;
            }
            self.sink.transcript(text);
        } else if !self.agent.is_voice() {
            self.sink.transcript(text);
            demo::schedule_reply(self.sink.clone(), text, self.demo_delay);
        } else {
            self.reply(client, ServerEvent::error("Voice session not active")).await;
        }
    }

    /// Stop the agent session
    pub async fn shutdown(&self) {
        info!("🛑 Stopping voice agent '{}'", self.agent.name());
        self.agent.stop().await;
    }

    async fn reply(&self, client: ClientId, event: ServerEvent) {
        if !self.hub.send_to(client, &event).await {
            debug!("Reply to client {} not delivered", client);
        }
    }
}
