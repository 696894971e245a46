//! Mock Voice Agent for Testing
//!
//! Records every typed message and lets a test speak as the agent.

use async_trait::async_trait;
use jarvis_bridge::agent::VoiceAgent;
use jarvis_bridge::bridge::EventSink;
use jarvis_bridge::error::{BridgeError, BridgeResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct MockAgent {
    /// Messages forwarded by the bridge
    pub sent: Arc<Mutex<Vec<String>>>,
    /// Make the next `start` fail
    pub should_fail: AtomicBool,
    active: AtomicBool,
    sink: Mutex<Option<EventSink>>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Emit a response as if the backend had said it
    pub fn say(&self, text: &str) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.response(text),
            None => false,
        }
    }
}

#[async_trait]
impl VoiceAgent for MockAgent {
    async fn start(&self, sink: EventSink) -> BridgeResult<()> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(BridgeError::Agent("Mock agent failure".to_string()));
        }
        *self.sink.lock().unwrap() = Some(sink);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.sink.lock().unwrap().take();
    }

    async fn send_text(&self, text: &str) -> BridgeResult<()> {
        if !self.is_active() {
            return Err(BridgeError::Agent("Voice session not active".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_voice(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}
