//! Conversation Socket Protocol
//!
//! JSON events of the ElevenLabs conversational agent WebSocket.
//! Inbound events are tagged by `type` and wrap their payload in a
//! `<name>_event` object; outbound audio chunks are the one untagged shape.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events received from the agent
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ConversationInitiationMetadata {
        conversation_initiation_metadata_event: InitiationMetadata,
    },
    UserTranscript {
        user_transcription_event: UserTranscription,
    },
    AgentResponse {
        agent_response_event: AgentResponseBody,
    },
    AgentResponseCorrection {
        agent_response_correction_event: AgentResponseCorrectionBody,
    },
    Audio {
        audio_event: AudioBody,
    },
    Interruption {
        #[serde(default)]
        interruption_event: Option<EventRef>,
    },
    Ping {
        ping_event: PingBody,
    },
    ClientToolCall {
        client_tool_call: ToolCallBody,
    },
    /// Anything we do not act on (vad scores, debug, internal tentative responses)
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitiationMetadata {
    pub conversation_id: String,
    #[serde(default)]
    pub agent_output_audio_format: Option<String>,
    #[serde(default)]
    pub user_input_audio_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserTranscription {
    pub user_transcript: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentResponseBody {
    pub agent_response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentResponseCorrectionBody {
    pub original_agent_response: String,
    pub corrected_agent_response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioBody {
    pub audio_base_64: String,
    #[serde(default)]
    pub event_id: u64,
}

impl AudioBody {
    /// Raw PCM bytes of the chunk
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.audio_base_64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRef {
    #[serde(default)]
    pub event_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingBody {
    pub event_id: u64,
    #[serde(default)]
    pub ping_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallBody {
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Tagged events sent to the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    ConversationInitiationClientData,
    Pong {
        event_id: u64,
    },
    ClientToolResult {
        tool_call_id: String,
        result: String,
        is_error: bool,
    },
    UserMessage {
        text: String,
    },
    UserActivity,
}

/// Microphone chunk, base64 PCM16 little-endian
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAudioChunk {
    pub user_audio_chunk: String,
}

impl UserAudioChunk {
    pub fn from_samples(samples: &[i16]) -> Self {
        Self {
            user_audio_chunk: STANDARD.encode(crate::audio::encode_pcm16(samples)),
        }
    }
}

/// Anything we may write to the conversation socket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Event(ClientEvent),
    Audio(UserAudioChunk),
}

impl From<ClientEvent> for Outbound {
    fn from(event: ClientEvent) -> Self {
        Outbound::Event(event)
    }
}

impl Outbound {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_and_response() {
        let raw = r#"{"type":"user_transcript","user_transcription_event":{"user_transcript":"hello jarvis"}}"#;
        match serde_json::from_str::<AgentEvent>(raw).unwrap() {
            AgentEvent::UserTranscript { user_transcription_event } => {
                assert_eq!(user_transcription_event.user_transcript, "hello jarvis");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let raw = r#"{"type":"agent_response","agent_response_event":{"agent_response":"At your service."}}"#;
        assert!(matches!(
            serde_json::from_str::<AgentEvent>(raw).unwrap(),
            AgentEvent::AgentResponse { .. }
        ));
    }

    #[test]
    fn test_parse_tool_call() {
        let raw = r#"{"type":"client_tool_call","client_tool_call":{"tool_name":"getWeather","tool_call_id":"call_1","parameters":{"location":"Jakarta"}}}"#;
        match serde_json::from_str::<AgentEvent>(raw).unwrap() {
            AgentEvent::ClientToolCall { client_tool_call } => {
                assert_eq!(client_tool_call.tool_name, "getWeather");
                assert_eq!(client_tool_call.parameters["location"], "Jakarta");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_types_are_tolerated() {
        let raw = r#"{"type":"vad_score","vad_score_event":{"vad_score":0.4}}"#;
        assert!(matches!(
            serde_json::from_str::<AgentEvent>(raw).unwrap(),
            AgentEvent::Unknown
        ));
    }

    #[test]
    fn test_outbound_shapes() {
        let pong = Outbound::from(ClientEvent::Pong { event_id: 7 }).to_json().unwrap();
        assert_eq!(pong, r#"{"type":"pong","event_id":7}"#);

        let init = Outbound::from(ClientEvent::ConversationInitiationClientData)
            .to_json()
            .unwrap();
        assert_eq!(init, r#"{"type":"conversation_initiation_client_data"}"#);

        let audio = Outbound::Audio(UserAudioChunk::from_samples(&[1, -1])).to_json().unwrap();
        assert!(audio.starts_with(r#"{"user_audio_chunk":""#));
        assert!(!audio.contains("type"));
    }

    #[test]
    fn test_audio_body_decodes() {
        let body = AudioBody {
            audio_base_64: STANDARD.encode([1u8, 0, 255, 255]),
            event_id: 1,
        };
        assert_eq!(body.decode().unwrap(), vec![1, 0, 255, 255]);
    }
}
