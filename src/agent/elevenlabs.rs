//! ElevenLabs conversational agent session
//!
//! One task per session owns the socket. It answers pings, relays what the
//! agent hears and says to the event sink, plays agent audio, streams the
//! microphone and runs client tool calls on their own tasks.

use super::protocol::{AgentEvent, ClientEvent, Outbound, UserAudioChunk};
use super::VoiceAgent;
use crate::audio::{calculate_energy, AudioInterface};
use crate::bridge::queue::EventSink;
use crate::config::{Config, Endpoints};
use crate::error::{BridgeError, BridgeResult};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::{Sink, SinkExt};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketWriter = SplitSink<Socket, Message>;

const OUTBOUND_CAPACITY: usize = 64;
const MIC_CAPACITY: usize = 32;
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct SignedUrl {
    signed_url: String,
}

struct SessionHandle {
    outbound: mpsc::Sender<Outbound>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// State shared between the session loop and its tool tasks
struct Session {
    sink: EventSink,
    tools: Arc<ToolRegistry>,
    audio: Arc<dyn AudioInterface>,
    outbound: mpsc::Sender<Outbound>,
    active: Arc<AtomicBool>,
    activity_dir: Option<PathBuf>,
}

pub struct ElevenLabsAgent {
    agent_id: String,
    api_key: String,
    requires_auth: bool,
    endpoints: Endpoints,
    http: reqwest::Client,
    tools: Arc<ToolRegistry>,
    audio: Arc<dyn AudioInterface>,
    session: Mutex<Option<SessionHandle>>,
    active: Arc<AtomicBool>,
}

impl ElevenLabsAgent {
    pub fn new(
        config: &Config,
        agent_id: String,
        api_key: String,
        tools: Arc<ToolRegistry>,
        audio: Arc<dyn AudioInterface>,
    ) -> BridgeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            agent_id,
            api_key,
            requires_auth: config.requires_auth,
            endpoints: config.endpoints.clone(),
            http,
            tools,
            audio,
            session: Mutex::new(None),
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// WebSocket URL for a new conversation. Private agents need a signed
    /// URL fetched with the API key; public agents connect directly.
    pub async fn conversation_url(&self) -> BridgeResult<String> {
        if !self.requires_auth {
            return Ok(format!(
                "{}/v1/convai/conversation?agent_id={}",
                self.endpoints.elevenlabs_ws,
                urlencoding::encode(&self.agent_id)
            ));
        }

        let response = self
            .http
            .get(format!(
                "{}/v1/convai/conversation/get_signed_url",
                self.endpoints.elevenlabs_api
            ))
            .query(&[("agent_id", self.agent_id.as_str())])
            .header("xi-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Agent(format!(
                "Signed URL request failed ({}): {}",
                status, body
            )));
        }

        let signed: SignedUrl = response.json().await?;
        Ok(signed.signed_url)
    }
}

#[async_trait]
impl VoiceAgent for ElevenLabsAgent {
    async fn start(&self, sink: EventSink) -> BridgeResult<()> {
        let mut slot = self.session.lock().await;
        if let Some(handle) = slot.as_ref() {
            if !handle.task.is_finished() {
                debug!("Voice session already running");
                return Ok(());
            }
        }

        info!("🔌 Connecting to ElevenLabs agent {}", self.agent_id);
        let url = self.conversation_url().await?;
        let (mut socket, _) = connect_async(url.as_str()).await?;
        send_json(
            &mut socket,
            &Outbound::from(ClientEvent::ConversationInitiationClientData),
        )
        .await?;

        // Opening the device blocks until cpal answers
        let (mic_tx, mic_rx) = mpsc::channel(MIC_CAPACITY);
        let audio = Arc::clone(&self.audio);
        match tokio::task::spawn_blocking(move || audio.start(mic_tx)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("⚠️ Microphone unavailable, continuing text-only: {}", e),
            Err(e) => warn!("⚠️ Microphone start failed, continuing text-only: {}", e),
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let session = Arc::new(Session {
            sink,
            tools: Arc::clone(&self.tools),
            audio: Arc::clone(&self.audio),
            outbound: outbound_tx.clone(),
            active: Arc::clone(&self.active),
            activity_dir: self.tools.context().activity_dir.clone(),
        });

        self.active.store(true, Ordering::SeqCst);
        if let Some(dir) = &session.activity_dir {
            crate::audit::log_session(dir, "started");
        }

        let task = tokio::spawn(run_session(socket, session, outbound_rx, mic_rx, shutdown_rx));
        *slot = Some(SessionHandle {
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
            task,
        });

        info!("🎤 Voice session started");
        Ok(())
    }

    async fn stop(&self) {
        let handle = self.session.lock().await.take();
        let Some(mut handle) = handle else {
            return;
        };

        if let Some(shutdown) = handle.shutdown.take() {
            let _ = shutdown.send(());
        }
        if tokio::time::timeout(STOP_TIMEOUT, &mut handle.task).await.is_err() {
            warn!("⚠️ Voice session did not stop in time, aborting");
            handle.task.abort();
            self.audio.stop();
        }
        self.active.store(false, Ordering::SeqCst);
    }

    async fn send_text(&self, text: &str) -> BridgeResult<()> {
        let outbound = {
            let slot = self.session.lock().await;
            slot.as_ref()
                .filter(|h| !h.task.is_finished())
                .map(|h| h.outbound.clone())
        };
        let Some(outbound) = outbound else {
            return Err(BridgeError::Agent("Voice session not active".to_string()));
        };

        outbound
            .send(Outbound::from(ClientEvent::UserMessage {
                text: text.to_string(),
            }))
            .await
            .map_err(|_| BridgeError::Agent("Voice session not active".to_string()))
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_voice(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

async fn send_json<S>(socket: &mut S, message: &Outbound) -> BridgeResult<()>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = message.to_json()?;
    socket.send(Message::Text(json.into())).await?;
    Ok(())
}

async fn run_session(
    socket: Socket,
    session: Arc<Session>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    mut mic_rx: mpsc::Receiver<Vec<i16>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let (mut writer, mut reader) = socket.split();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Closing voice session on request");
                let _ = writer.send(Message::Close(None)).await;
                break;
            }
            Some(message) = outbound_rx.recv() => {
                if let Err(e) = send_json(&mut writer, &message).await {
                    warn!("❌ Voice session write failed: {}", e);
                    break;
                }
            }
            Some(chunk) = mic_rx.recv() => {
                trace!("🎙️ {} samples, energy {:.0}", chunk.len(), calculate_energy(&chunk));
                let message = Outbound::Audio(UserAudioChunk::from_samples(&chunk));
                if let Err(e) = send_json(&mut writer, &message).await {
                    warn!("❌ Voice session write failed: {}", e);
                    break;
                }
            }
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_event(text.as_str(), &session) {
                        if let Err(e) = send_json(&mut writer, &reply).await {
                            warn!("❌ Voice session write failed: {}", e);
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("🔌 Agent closed the session: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("❌ Voice session error: {}", e);
                    session.sink.error(format!("Voice session error: {}", e));
                    break;
                }
                None => {
                    info!("🔌 Voice session socket closed");
                    break;
                }
            }
        }
    }

    finish_session(&session, &mut writer).await;
}

async fn finish_session(session: &Session, writer: &mut SocketWriter) {
    let _ = writer.close().await;
    session.audio.stop();
    session.active.store(false, Ordering::SeqCst);
    if let Some(dir) = &session.activity_dir {
        crate::audit::log_session(dir, "ended");
    }
    session.sink.status("Voice session ended", false);
    info!("🔇 Voice session ended");
}

/// Act on one inbound event. Returns a message to write back immediately.
fn handle_event(raw: &str, session: &Arc<Session>) -> Option<Outbound> {
    let event: AgentEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!("Ignoring unparseable agent event: {}", e);
            return None;
        }
    };

    match event {
        AgentEvent::ConversationInitiationMetadata {
            conversation_initiation_metadata_event: meta,
        } => {
            info!("🗣️ Conversation {} started", meta.conversation_id);
            debug!(
                "  - audio in: {:?}, out: {:?}",
                meta.user_input_audio_format, meta.agent_output_audio_format
            );
        }
        AgentEvent::UserTranscript {
            user_transcription_event,
        } => {
            let text = user_transcription_event.user_transcript;
            info!("👤 User: {}", text);
            session.sink.transcript(text);
        }
        AgentEvent::AgentResponse {
            agent_response_event,
        } => {
            let text = agent_response_event.agent_response;
            info!("🤖 Agent: {}", text);
            session.sink.response(text);
        }
        AgentEvent::AgentResponseCorrection {
            agent_response_correction_event: c,
        } => {
            debug!("✏️ Agent corrected its response");
            session
                .sink
                .correction(c.original_agent_response, c.corrected_agent_response);
        }
        AgentEvent::Audio { audio_event } => match audio_event.decode() {
            Ok(pcm) => session.audio.output(pcm),
            Err(e) => debug!("Dropping undecodable audio chunk {}: {}", audio_event.event_id, e),
        },
        AgentEvent::Interruption { .. } => {
            debug!("✋ Agent interrupted");
            session.audio.interrupt();
        }
        AgentEvent::Ping { ping_event } => {
            trace!("Ping {} ({:?} ms)", ping_event.event_id, ping_event.ping_ms);
            return Some(Outbound::from(ClientEvent::Pong {
                event_id: ping_event.event_id,
            }));
        }
        AgentEvent::ClientToolCall { client_tool_call } => {
            let session = Arc::clone(session);
            tokio::spawn(async move {
                let outcome = session
                    .tools
                    .execute(&client_tool_call.tool_name, &client_tool_call.parameters)
                    .await;
                session
                    .sink
                    .tool_result(outcome.tool.clone(), outcome.output.clone(), outcome.is_error);

                let reply = Outbound::from(ClientEvent::ClientToolResult {
                    tool_call_id: client_tool_call.tool_call_id,
                    result: outcome.output,
                    is_error: outcome.is_error,
                });
                if session.outbound.send(reply).await.is_err() {
                    debug!("Session closed before tool result could be sent");
                }
            });
        }
        AgentEvent::Unknown => {
            trace!("Ignoring agent event: {}", raw.chars().take(80).collect::<String>());
        }
    }

    None
}
