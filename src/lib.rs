//! Jarvis Bridge Library
//!
//! Connects a conversational voice agent to a browser UI over WebSocket and
//! exposes a table of tools the agent can call.

pub mod agent;
pub mod app;
pub mod audio;
pub mod audit;
pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod system;
pub mod tools;
