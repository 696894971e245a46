//! Agent speech playback
//!
//! rodio's output stream is not `Send`, so a dedicated thread owns it and
//! takes commands over a channel.

use super::SAMPLE_RATE;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info, warn};

enum PlaybackCommand {
    Play(Vec<i16>),
    Interrupt,
    Stop,
}

/// Thread-safe handle to the playback thread
#[derive(Clone)]
pub struct Playback {
    sender: mpsc::Sender<PlaybackCommand>,
}

impl std::fmt::Debug for Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playback").finish()
    }
}

impl Playback {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<PlaybackCommand>();

        thread::spawn(move || {
            Self::audio_thread(receiver);
        });

        Self { sender }
    }

    fn audio_thread(receiver: mpsc::Receiver<PlaybackCommand>) {
        use rodio::buffer::SamplesBuffer;
        use rodio::{OutputStream, Sink};

        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize audio output: {}", e);
                return;
            }
        };

        let _stream = stream;
        let mut sink = match Sink::try_new(&stream_handle) {
            Ok(s) => s,
            Err(e) => {
                error!("❌ Failed to create audio sink: {}", e);
                return;
            }
        };

        info!("🔊 Playback thread started");

        while let Ok(cmd) = receiver.recv() {
            match cmd {
                PlaybackCommand::Play(samples) => {
                    if samples.is_empty() {
                        continue;
                    }
                    debug!("🔊 Queueing {} samples", samples.len());
                    sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
                }
                PlaybackCommand::Interrupt => {
                    debug!("🛑 Interrupting playback");
                    sink.stop();
                    // A stopped sink stays unusable, start a fresh one
                    if let Ok(new_sink) = Sink::try_new(&stream_handle) {
                        sink = new_sink;
                    }
                }
                PlaybackCommand::Stop => {
                    sink.stop();
                    break;
                }
            }
        }

        info!("🔇 Playback thread stopped");
    }

    /// Queue samples behind whatever is already playing
    pub fn play(&self, samples: Vec<i16>) {
        if self.sender.send(PlaybackCommand::Play(samples)).is_err() {
            debug!("Playback thread gone, dropping audio");
        }
    }

    /// Stop current speech and clear the queue
    pub fn interrupt(&self) {
        let _ = self.sender.send(PlaybackCommand::Interrupt);
    }

    /// End the playback thread
    pub fn stop(&self) {
        let _ = self.sender.send(PlaybackCommand::Stop);
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}
