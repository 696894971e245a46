//! Microphone capture using cpal

use super::{CHUNK_SIZE, SAMPLE_RATE};
use crate::error::{BridgeError, BridgeResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Whether the default host exposes an input device
pub fn has_input_device() -> bool {
    cpal::default_host().default_input_device().is_some()
}

/// A running capture. The stream lives on its own thread until `stop`.
pub struct MicCapture {
    stop_tx: std_mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl MicCapture {
    /// Open the input device and start sending chunks to `output`.
    /// Chunks are dropped when the receiver is not keeping up.
    pub fn start(device_index: Option<usize>, output: mpsc::Sender<Vec<i16>>) -> BridgeResult<Self> {
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<BridgeResult<()>>();

        let thread = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(device_index, output) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Parked until stop() or the handle is dropped
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Microphone stream closed");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("🎙️ Audio capture started");
                Ok(Self {
                    stop_tx,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(BridgeError::Audio("Capture thread exited".to_string())),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            info!("🎙️ Audio capture stopped");
        }
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn open_stream(device_index: Option<usize>, output: mpsc::Sender<Vec<i16>>) -> BridgeResult<cpal::Stream> {
    let host = cpal::default_host();

    let device = match device_index {
        Some(idx) => host
            .input_devices()
            .map_err(|e| BridgeError::Audio(e.to_string()))?
            .nth(idx)
            .ok_or_else(|| BridgeError::Audio("Device index out of range".to_string()))?,
        None => host
            .default_input_device()
            .ok_or_else(|| BridgeError::Audio("No default input device".to_string()))?,
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio device: {}", device_name);

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Fixed(CHUNK_SIZE as u32),
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                match output.try_send(data.to_vec()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => debug!("Mic chunk dropped, session busy"),
                    Err(TrySendError::Closed(_)) => {}
                }
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| BridgeError::Audio(e.to_string()))?;

    stream.play().map_err(|e| BridgeError::Audio(e.to_string()))?;
    Ok(stream)
}
