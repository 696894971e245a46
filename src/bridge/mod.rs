//! Bridge Module
//!
//! The path from the voice agent to the browser: a bounded event queue fed
//! from any thread, a single dispatcher broadcasting through the client hub,
//! and the WebSocket server whose actions the controller routes.

pub mod controller;
pub mod hub;
pub mod messages;
pub mod queue;
pub mod server;

pub use controller::Controller;
pub use hub::{ClientHub, ClientId, Frame};
pub use messages::{ClientAction, ServerEvent};
pub use queue::{EventQueue, EventSink};
pub use server::{router, BridgeState};
