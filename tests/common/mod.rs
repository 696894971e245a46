#![allow(dead_code)]

pub mod mock_agent;

use futures::{SinkExt, StreamExt};
use jarvis_bridge::agent::{DemoAgent, VoiceAgent};
use jarvis_bridge::app::{self, RunningBridge};
use jarvis_bridge::config::Config;
use jarvis_bridge::tools::{ToolContext, ToolRegistry};
use mock_agent::MockAgent;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub bridge: RunningBridge,
}

impl TestContext {
    /// Bridge on ephemeral ports with the given agent
    pub async fn with_agent(agent: Arc<dyn VoiceAgent>) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = test_config(&temp_dir);
        let tools = Arc::new(ToolRegistry::with_defaults(ToolContext::for_workspace(
            temp_dir.path(),
        )));
        let bridge = app::start_with(&config, agent, tools)
            .await
            .expect("Failed to start bridge");
        Self { temp_dir, bridge }
    }

    pub async fn demo() -> Self {
        Self::with_agent(Arc::new(DemoAgent::new(Duration::from_millis(10)))).await
    }

    pub async fn mock() -> (Self, Arc<MockAgent>) {
        let agent = Arc::new(MockAgent::new());
        let ctx = Self::with_agent(Arc::clone(&agent) as Arc<dyn VoiceAgent>).await;
        (ctx, agent)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.bridge.http_addr, path)
    }

    /// Connect a UI client and consume its `connection` greeting
    pub async fn connect(&self) -> (Client, Value) {
        let url = format!("ws://{}/ws", self.bridge.ws_addr);
        let (mut client, _) = connect_async(url.as_str())
            .await
            .expect("Failed to connect to bridge");
        let greeting = next_event(&mut client).await;
        (client, greeting)
    }

    pub async fn client_count(&self) -> usize {
        self.bridge.controller.hub().count().await
    }

    /// Wait until exactly `n` clients are registered, up to two seconds
    pub async fn wait_for_clients(&self, n: usize) -> bool {
        for _ in 0..200 {
            if self.client_count().await == n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.http_port = 0;
    config.ws_port = 0;
    config.open_browser = false;
    config.audio_enabled = false;
    config.demo_delay_ms = 10;
    config.workspace_dir = temp_dir.path().to_string_lossy().to_string();
    config.ui_dir = temp_dir.path().join("templates").to_string_lossy().to_string();
    config.static_dir = temp_dir.path().join("static").to_string_lossy().to_string();
    config
}

pub async fn send_json(client: &mut Client, value: Value) {
    send_text(client, &value.to_string()).await;
}

pub async fn send_text(client: &mut Client, text: &str) {
    client
        .send(Message::Text(text.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Next JSON text frame, failing the test after two seconds
pub async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Connection closed")
            .expect("Socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("Event is not JSON");
        }
    }
}
