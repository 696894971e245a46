//! Client Hub
//!
//! The set of connected UI sockets. Each client is represented by the
//! sending half of its bounded outbound channel; the connection's writer
//! task owns the receiving half and the socket itself.

use super::messages::ServerEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

pub type ClientId = u64;

/// Serialized event shared between all recipients
pub type Frame = Arc<str>;

/// Registry of connected clients with fan-out
pub struct ClientHub {
    clients: RwLock<HashMap<ClientId, mpsc::Sender<Frame>>>,
    next_id: AtomicU64,
}

impl ClientHub {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a client and return its id
    pub async fn register(&self, sender: mpsc::Sender<Frame>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut clients = self.clients.write().await;
        clients.insert(id, sender);
        info!("👤 Client {} connected. Total: {}", id, clients.len());
        id
    }

    /// Remove a client. Removing an unknown id is a no-op.
    pub async fn unregister(&self, id: ClientId) {
        let mut clients = self.clients.write().await;
        if clients.remove(&id).is_some() {
            info!("👋 Client {} disconnected. Total: {}", id, clients.len());
        }
    }

    /// Send an event to one client. A failed send drops the client.
    pub async fn send_to(&self, id: ClientId, event: &ServerEvent) -> bool {
        let Some(frame) = encode(event) else {
            return false;
        };

        let sender = { self.clients.read().await.get(&id).cloned() };
        match sender {
            Some(tx) => {
                if tx.try_send(frame).is_ok() {
                    true
                } else {
                    debug!("Send to client {} failed, dropping it", id);
                    self.unregister(id).await;
                    false
                }
            }
            None => false,
        }
    }

    /// Send an event to every client, removing the ones that fail.
    /// Returns the number of clients that accepted the event.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let clients = self.clients.read().await;
            for (id, tx) in clients.iter() {
                if tx.try_send(Arc::clone(&frame)).is_ok() {
                    delivered += 1;
                } else {
                    failed.push(*id);
                }
            }
        }

        if !failed.is_empty() {
            let mut clients = self.clients.write().await;
            for id in &failed {
                clients.remove(id);
            }
            debug!(
                "Dropped {} unreachable client(s), {} remaining",
                failed.len(),
                clients.len()
            );
        }

        debug!("📣 Broadcast {} to {} client(s)", event.kind(), delivered);
        delivered
    }

    /// Number of connected clients
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(event: &ServerEvent) -> Option<Frame> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!("Failed to serialize {} event: {}", event.kind(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(capacity: usize) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        mpsc::channel(capacity)
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let hub = ClientHub::new();
        let (tx, _rx) = client(4);
        let id = hub.register(tx).await;
        assert_eq!(hub.count().await, 1);

        hub.unregister(id).await;
        hub.unregister(id).await;
        assert_eq!(hub.count().await, 0);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let hub = ClientHub::new();
        let (tx1, _rx1) = client(4);
        let (tx2, _rx2) = client(4);
        let a = hub.register(tx1).await;
        let b = hub.register(tx2).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_clients() {
        let hub = ClientHub::new();
        let (tx1, mut rx1) = client(4);
        let (tx2, mut rx2) = client(4);
        hub.register(tx1).await;
        hub.register(tx2).await;

        let delivered = hub.broadcast(&ServerEvent::transcript("hello")).await;
        assert_eq!(delivered, 2);

        let frame = rx1.try_recv().unwrap();
        assert!(frame.contains("\"type\":\"transcript\""));
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_removes_disconnected_clients() {
        let hub = ClientHub::new();
        let (tx1, rx1) = client(4);
        let (tx2, mut rx2) = client(4);
        hub.register(tx1).await;
        hub.register(tx2).await;

        drop(rx1);
        let delivered = hub.broadcast(&ServerEvent::response("first")).await;
        assert_eq!(delivered, 1);
        assert_eq!(hub.count().await, 1);

        // Subsequent broadcasts keep working for the survivor
        let delivered = hub.broadcast(&ServerEvent::response("second")).await;
        assert_eq!(delivered, 1);
        assert!(rx2.try_recv().unwrap().contains("first"));
        assert!(rx2.try_recv().unwrap().contains("second"));
    }

    #[tokio::test]
    async fn test_full_client_is_dropped() {
        let hub = ClientHub::new();
        let (tx, _rx) = client(1);
        hub.register(tx).await;

        assert_eq!(hub.broadcast(&ServerEvent::response("one")).await, 1);
        assert_eq!(hub.broadcast(&ServerEvent::response("two")).await, 0);
        assert_eq!(hub.count().await, 0);
    }

    #[tokio::test]
    async fn test_send_to_single_client() {
        let hub = ClientHub::new();
        let (tx1, mut rx1) = client(4);
        let (tx2, mut rx2) = client(4);
        let id1 = hub.register(tx1).await;
        hub.register(tx2).await;

        assert!(hub.send_to(id1, &ServerEvent::status("Stopped", false)).await);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
        assert!(!hub.send_to(999, &ServerEvent::status("x", false)).await);
    }

    #[tokio::test]
    async fn test_broadcast_with_no_clients() {
        let hub = ClientHub::new();
        assert_eq!(hub.broadcast(&ServerEvent::error("nobody home")).await, 0);
    }
}
