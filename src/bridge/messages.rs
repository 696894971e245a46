//! Bridge Message Types
//!
//! JSON messages exchanged with the browser UI. Clients send
//! `action`-tagged requests, the server answers with `type`-tagged events
//! that always carry a local ISO-8601 timestamp.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const KNOWN_ACTIONS: &[&str] = &[
    "start_listening",
    "stop_listening",
    "use_tool",
    "send_message",
];

/// Requests sent from the UI to the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// Open a voice session (or run the demo script)
    StartListening,

    /// Close the voice session
    StopListening,

    /// Activate a tool, optionally running it with parameters
    UseTool {
        tool: String,
        #[serde(default, alias = "params", skip_serializing_if = "Option::is_none")]
        parameters: Option<Value>,
    },

    /// Send a typed message to the agent
    SendMessage {
        #[serde(default)]
        text: String,
    },
}

impl ClientAction {
    /// Parse a raw text frame. Errors are meant to be reported back to the
    /// sender, never to tear down the connection.
    pub fn parse(raw: &str) -> BridgeResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| BridgeError::Protocol(format!("Invalid JSON: {}", e)))?;

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| BridgeError::Protocol("Missing 'action' field".to_string()))?
            .to_string();

        if !KNOWN_ACTIONS.contains(&action.as_str()) {
            return Err(BridgeError::Protocol(format!("Unknown action: {}", action)));
        }

        serde_json::from_value(value)
            .map_err(|e| BridgeError::Protocol(format!("Invalid '{}' message: {}", action, e)))
    }
}

/// Events sent from the bridge to every UI client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Greeting sent once per connection
    Connection {
        status: String,
        message: String,
        voice_enabled: bool,
        demo_mode: bool,
        timestamp: String,
    },

    /// Session state change
    Status {
        message: String,
        listening: bool,
        timestamp: String,
    },

    /// What the user said
    Transcript { text: String, timestamp: String },

    /// What the agent said
    Response { text: String, timestamp: String },

    /// The agent revised an earlier response
    Correction {
        text: String,
        original: String,
        timestamp: String,
    },

    /// Output of a tool run
    ToolResult {
        tool: String,
        result: String,
        is_error: bool,
        timestamp: String,
    },

    /// A tool was selected in the UI
    ToolActivation {
        tool: String,
        message: String,
        timestamp: String,
    },

    Error { message: String, timestamp: String },
}

/// Local time in ISO-8601 with microseconds
pub fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

impl ServerEvent {
    pub fn connection(voice_enabled: bool, demo_mode: bool) -> Self {
        let message = if voice_enabled {
            "JARVIS Voice Ready"
        } else {
            "JARVIS Demo Mode"
        };
        ServerEvent::Connection {
            status: "connected".to_string(),
            message: message.to_string(),
            voice_enabled,
            demo_mode,
            timestamp: timestamp(),
        }
    }

    pub fn status(message: impl Into<String>, listening: bool) -> Self {
        ServerEvent::Status {
            message: message.into(),
            listening,
            timestamp: timestamp(),
        }
    }

    pub fn transcript(text: impl Into<String>) -> Self {
        ServerEvent::Transcript {
            text: text.into(),
            timestamp: timestamp(),
        }
    }

    pub fn response(text: impl Into<String>) -> Self {
        ServerEvent::Response {
            text: text.into(),
            timestamp: timestamp(),
        }
    }

    pub fn correction(original: impl Into<String>, corrected: impl Into<String>) -> Self {
        ServerEvent::Correction {
            text: corrected.into(),
            original: original.into(),
            timestamp: timestamp(),
        }
    }

    pub fn tool_result(tool: impl Into<String>, result: impl Into<String>, is_error: bool) -> Self {
        ServerEvent::ToolResult {
            tool: tool.into(),
            result: result.into(),
            is_error,
            timestamp: timestamp(),
        }
    }

    pub fn tool_activation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::ToolActivation {
            tool: tool.into(),
            message: message.into(),
            timestamp: timestamp(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
            timestamp: timestamp(),
        }
    }

    /// Wire name of the event, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connection { .. } => "connection",
            ServerEvent::Status { .. } => "status",
            ServerEvent::Transcript { .. } => "transcript",
            ServerEvent::Response { .. } => "response",
            ServerEvent::Correction { .. } => "correction",
            ServerEvent::ToolResult { .. } => "tool_result",
            ServerEvent::ToolActivation { .. } => "tool_activation",
            ServerEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_actions() {
        assert_eq!(
            ClientAction::parse(r#"{"action":"start_listening"}"#).unwrap(),
            ClientAction::StartListening
        );
        assert_eq!(
            ClientAction::parse(r#"{"action":"stop_listening","extra":1}"#).unwrap(),
            ClientAction::StopListening
        );
    }

    #[test]
    fn test_parse_use_tool_accepts_params_alias() {
        let action =
            ClientAction::parse(r#"{"action":"use_tool","tool":"weather","params":{"location":"Oslo"}}"#)
                .unwrap();
        match action {
            ClientAction::UseTool { tool, parameters } => {
                assert_eq!(tool, "weather");
                assert_eq!(parameters.unwrap()["location"], "Oslo");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_parse_reports_invalid_json() {
        let err = ClientAction::parse("not json at all").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_parse_reports_unknown_and_missing_action() {
        let err = ClientAction::parse(r#"{"action":"dance"}"#).unwrap_err();
        assert!(err.to_string().contains("Unknown action: dance"));

        let err = ClientAction::parse(r#"{"tool":"search"}"#).unwrap_err();
        assert!(err.to_string().contains("Missing 'action'"));

        let err = ClientAction::parse(r#"{"action":"use_tool"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid 'use_tool' message"));
    }

    #[test]
    fn test_server_event_wire_format() {
        let json = serde_json::to_value(ServerEvent::correction("old", "new")).unwrap();
        assert_eq!(json["type"], "correction");
        assert_eq!(json["text"], "new");
        assert_eq!(json["original"], "old");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));

        let json = serde_json::to_value(ServerEvent::tool_activation("search", "Searching")).unwrap();
        assert_eq!(json["type"], "tool_activation");
    }

    #[test]
    fn test_every_event_has_timestamp() {
        let events = vec![
            ServerEvent::connection(false, true),
            ServerEvent::status("Stopped", false),
            ServerEvent::transcript("hi"),
            ServerEvent::response("hello"),
            ServerEvent::tool_result("calculateMath", "Result: 2", false),
            ServerEvent::error("boom"),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.kind());
            assert!(json.get("timestamp").is_some(), "{} lacks timestamp", event.kind());
        }
    }
}
