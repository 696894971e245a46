//! Audio Module
//!
//! Local microphone and speaker plumbing for the voice session. The vendor
//! session exchanges 16 kHz mono PCM16; capture and playback each run on a
//! dedicated thread because the device handles are not `Send`.

use crate::error::BridgeResult;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod capture;
pub mod playback;

pub use capture::MicCapture;
pub use playback::Playback;

pub const SAMPLE_RATE: u32 = 16000;
pub const CHUNK_SIZE: usize = 1024;

/// Audio I/O used by a voice session
pub trait AudioInterface: Send + Sync {
    /// Begin delivering microphone chunks to `input`
    fn start(&self, input: mpsc::Sender<Vec<i16>>) -> BridgeResult<()>;

    /// Stop capture and playback. Safe to call more than once.
    fn stop(&self);

    /// Queue a chunk of PCM16 little-endian bytes for playback
    fn output(&self, pcm: Vec<u8>);

    /// Drop whatever is still queued for playback
    fn interrupt(&self);

    fn name(&self) -> &str;
}

/// No devices: output is discarded and nothing is captured
#[derive(Debug, Default)]
pub struct TextOnlyAudio;

impl AudioInterface for TextOnlyAudio {
    fn start(&self, _input: mpsc::Sender<Vec<i16>>) -> BridgeResult<()> {
        info!("🔇 Text-only audio, microphone disabled");
        Ok(())
    }

    fn stop(&self) {}

    fn output(&self, _pcm: Vec<u8>) {}

    fn interrupt(&self) {}

    fn name(&self) -> &str {
        "text-only"
    }
}

/// Default input and output devices
pub struct DeviceAudio {
    capture: Mutex<Option<MicCapture>>,
    playback: Mutex<Option<Playback>>,
}

impl DeviceAudio {
    pub fn new() -> Self {
        Self {
            capture: Mutex::new(None),
            playback: Mutex::new(None),
        }
    }
}

impl Default for DeviceAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioInterface for DeviceAudio {
    fn start(&self, input: mpsc::Sender<Vec<i16>>) -> BridgeResult<()> {
        let mic = MicCapture::start(None, input)?;
        if let Ok(mut slot) = self.capture.lock() {
            if let Some(old) = slot.replace(mic) {
                old.stop();
            }
        }
        if let Ok(mut slot) = self.playback.lock() {
            if slot.is_none() {
                *slot = Some(Playback::new());
            }
        }
        Ok(())
    }

    fn stop(&self) {
        if let Ok(mut slot) = self.capture.lock() {
            if let Some(mic) = slot.take() {
                mic.stop();
            }
        }
        if let Ok(mut slot) = self.playback.lock() {
            if let Some(player) = slot.take() {
                player.stop();
            }
        }
    }

    fn output(&self, pcm: Vec<u8>) {
        let samples = decode_pcm16(&pcm);
        if let Ok(slot) = self.playback.lock() {
            if let Some(player) = slot.as_ref() {
                player.play(samples);
            }
        }
    }

    fn interrupt(&self) {
        if let Ok(slot) = self.playback.lock() {
            if let Some(player) = slot.as_ref() {
                player.interrupt();
            }
        }
    }

    fn name(&self) -> &str {
        "device"
    }
}

/// Pick device audio when enabled, falling back to text-only when no input
/// device is present
pub fn create_audio(enabled: bool) -> Arc<dyn AudioInterface> {
    if !enabled {
        return Arc::new(TextOnlyAudio);
    }
    if capture::has_input_device() {
        info!("🎙️ Using default audio devices");
        Arc::new(DeviceAudio::new())
    } else {
        warn!("⚠️ No audio input device found, continuing text-only");
        Arc::new(TextOnlyAudio)
    }
}

/// PCM16 little-endian bytes to samples. A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Samples to PCM16 little-endian bytes
pub fn encode_pcm16(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Calculate audio energy (RMS)
pub fn calculate_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: i64 = samples.iter().map(|&s| (s as i64).pow(2)).sum();
    (sum as f32 / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0i16; 100];
        assert_eq!(calculate_energy(&silence), 0.0);

        let loud = vec![1000i16; 100];
        assert!((calculate_energy(&loud) - 1000.0).abs() < 0.01);
        assert_eq!(calculate_energy(&[]), 0.0);
    }

    #[test]
    fn test_pcm16_layout() {
        assert_eq!(encode_pcm16(&[1, -2]), vec![1, 0, 0xFE, 0xFF]);
        assert_eq!(decode_pcm16(&[1, 0, 0xFE, 0xFF, 7]), vec![1, -2]);
    }

    #[test]
    fn test_text_only_is_inert() {
        let audio = TextOnlyAudio;
        let (tx, mut rx) = mpsc::channel(1);
        audio.start(tx).unwrap();
        audio.output(vec![0; 32]);
        audio.interrupt();
        audio.stop();
        assert!(rx.try_recv().is_err());
        assert_eq!(audio.name(), "text-only");
    }

    #[test]
    fn test_disabled_audio_is_text_only() {
        assert_eq!(create_audio(false).name(), "text-only");
    }
}
