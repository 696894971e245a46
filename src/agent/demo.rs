//! Demo agent used when no voice backend is configured

use super::VoiceAgent;
use crate::bridge::queue::EventSink;
use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

pub const DEMO_GREETING: &str = "Hello JARVIS!";
pub const DEMO_RESPONSE: &str = "Voice requires API configuration.";
const INTRODUCTION: &str = "I am JARVIS, your AI assistant. I can search the web, generate images, save data, create HTML files, and much more. How may I assist you today?";

/// Canned answer to a typed message
pub fn demo_reply(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let greeting = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| matches!(w, "hello" | "hi" | "hey" | "jarvis"))
        || lower.contains("who are you");
    if greeting {
        INTRODUCTION
    } else {
        DEMO_RESPONSE
    }
}

/// Emit the canned answer to `text` after `delay`
pub fn schedule_reply(sink: EventSink, text: &str, delay: Duration) -> JoinHandle<()> {
    let reply = demo_reply(text);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        sink.response(reply);
    })
}

/// Scripted conversation without any backend
pub struct DemoAgent {
    delay: Duration,
    active: AtomicBool,
    sink: Mutex<Option<EventSink>>,
    script: Mutex<Option<JoinHandle<()>>>,
}

impl DemoAgent {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: AtomicBool::new(false),
            sink: Mutex::new(None),
            script: Mutex::new(None),
        }
    }

    fn replace_script(&self, task: JoinHandle<()>) {
        if let Ok(mut slot) = self.script.lock() {
            if let Some(old) = slot.replace(task) {
                old.abort();
            }
        }
    }
}

#[async_trait]
impl VoiceAgent for DemoAgent {
    async fn start(&self, sink: EventSink) -> BridgeResult<()> {
        info!("🎭 Demo session started");
        self.active.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.sink.lock() {
            *slot = Some(sink.clone());
        }

        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.transcript(DEMO_GREETING);
            tokio::time::sleep(delay).await;
            sink.response(DEMO_RESPONSE);
        });
        self.replace_script(task);
        Ok(())
    }

    async fn stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("🎭 Demo session stopped");
        }
        if let Ok(mut slot) = self.script.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        if let Ok(mut slot) = self.sink.lock() {
            slot.take();
        }
    }

    /// Answer a typed message after the demo delay
    async fn send_text(&self, text: &str) -> BridgeResult<()> {
        let sink = self
            .sink
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .filter(|_| self.is_active())
            .ok_or_else(|| BridgeError::Agent("Voice session not active".to_string()))?;
        schedule_reply(sink, text, self.delay);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_voice(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "demo"
    }
}
