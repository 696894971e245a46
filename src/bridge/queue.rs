//! Event Queue
//!
//! Hand-off between code that produces events on arbitrary threads (the
//! vendor session, audio callbacks, tool tasks) and the single task that
//! broadcasts them. Producers never block: a full queue drops the event.

use super::hub::ClientHub;
use super::messages::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Create a bounded queue. The sink side may be cloned freely.
pub fn channel(capacity: usize) -> (EventSink, EventQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSink { tx }, EventQueue { rx })
}

/// Producer handle. Safe to call from any thread, inside or outside the runtime.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::Sender<ServerEvent>,
}

impl EventSink {
    /// Enqueue an event without blocking. Returns `false` if it was dropped.
    pub fn emit(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("⚠️ Event queue full, dropping {} event", event.kind());
                false
            }
            Err(TrySendError::Closed(event)) => {
                debug!("Event queue closed, discarding {} event", event.kind());
                false
            }
        }
    }

    pub fn transcript(&self, text: impl Into<String>) -> bool {
        self.emit(ServerEvent::transcript(text))
    }

    pub fn response(&self, text: impl Into<String>) -> bool {
        self.emit(ServerEvent::response(text))
    }

    pub fn correction(&self, original: impl Into<String>, corrected: impl Into<String>) -> bool {
        self.emit(ServerEvent::correction(original, corrected))
    }

    pub fn status(&self, message: impl Into<String>, listening: bool) -> bool {
        self.emit(ServerEvent::status(message, listening))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(ServerEvent::error(message))
    }

    pub fn tool_result(&self, tool: impl Into<String>, result: impl Into<String>, is_error: bool) -> bool {
        self.emit(ServerEvent::tool_result(tool, result, is_error))
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by exactly one task
pub struct EventQueue {
    rx: mpsc::Receiver<ServerEvent>,
}

impl EventQueue {
    /// Next event, waiting if the queue is empty
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain events in FIFO order and broadcast each one. Returns once every
    /// sink has been dropped and the queue is empty.
    pub async fn run(mut self, hub: Arc<ClientHub>) {
        info!("📬 Event dispatcher started");
        while let Some(event) = self.rx.recv().await {
            hub.broadcast(&event).await;
        }
        info!("📭 Event dispatcher stopped");
    }

    /// Run the dispatcher on its own task
    pub fn spawn(self, hub: Arc<ClientHub>) -> JoinHandle<()> {
        tokio::spawn(self.run(hub))
    }
}
