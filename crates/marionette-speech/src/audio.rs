//! Audio collaborators
//!
//! Decoding and playback belong to the host. The queue only needs a buffer
//! with a known duration and an output it can start, stop and resume.

use std::sync::Arc;

use marionette_core::{AnimError, AnimResult};

/// Decoded, playable audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub duration_ms: f64,
    /// Mono samples; empty when the host keeps the samples itself
    pub samples: Arc<[f32]>,
}

impl AudioBuffer {
    pub fn from_samples(sample_rate: u32, samples: Vec<f32>) -> Self {
        let duration_ms = if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f64 * 1000.0 / sample_rate as f64
        };
        Self {
            sample_rate,
            duration_ms,
            samples: samples.into(),
        }
    }

    /// Buffer known only by its length
    pub fn with_duration(sample_rate: u32, duration_ms: f64) -> Self {
        Self {
            sample_rate,
            duration_ms: duration_ms.max(0.0),
            samples: Arc::from(Vec::new()),
        }
    }
}

/// Turns encoded bytes into a buffer
pub trait AudioDecoder {
    fn decode(&self, bytes: &[u8]) -> AnimResult<AudioBuffer>;
}

/// Signed 16-bit little-endian mono PCM
#[derive(Debug, Clone, Copy)]
pub struct PcmDecoder {
    pub sample_rate: u32,
}

impl Default for PcmDecoder {
    fn default() -> Self {
        Self { sample_rate: 22050 }
    }
}

impl AudioDecoder for PcmDecoder {
    fn decode(&self, bytes: &[u8]) -> AnimResult<AudioBuffer> {
        if bytes.is_empty() {
            return Err(AnimError::AudioDecode("empty audio".into()));
        }
        if bytes.len() % 2 != 0 {
            return Err(AnimError::AudioDecode(format!(
                "odd byte count {} for 16-bit PCM",
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        Ok(AudioBuffer::from_samples(self.sample_rate, samples))
    }
}

/// Playback sink.
///
/// `play` starts one buffer; the host reports its end back through the
/// engine. A suspended output (e.g. before a user gesture unlocked audio)
/// is asked to resume and polled until it does.
pub trait AudioOutput {
    fn play(&mut self, buffer: &AudioBuffer, rate: f64) -> AnimResult<()>;

    fn stop(&mut self);

    fn is_suspended(&self) -> bool {
        false
    }

    fn request_resume(&mut self) {}

    /// Delay between `play` and audible output
    fn output_latency_ms(&self) -> f64 {
        0.0
    }
}

/// Output that plays nothing (headless hosts)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioOutput for NullAudio {
    fn play(&mut self, _buffer: &AudioBuffer, _rate: f64) -> AnimResult<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_decode() {
        let decoder = PcmDecoder { sample_rate: 1000 };
        let bytes: Vec<u8> = [0i16, i16::MAX, i16::MIN, 0]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let buffer = decoder.decode(&bytes).unwrap();
        assert_eq!(buffer.samples.len(), 4);
        assert_eq!(buffer.duration_ms, 4.0);
        assert_eq!(buffer.samples[2], -1.0);
    }

    #[test]
    fn test_pcm_decode_errors() {
        let decoder = PcmDecoder::default();
        assert!(matches!(decoder.decode(&[]), Err(AnimError::AudioDecode(_))));
        assert!(matches!(decoder.decode(&[1, 2, 3]), Err(AnimError::AudioDecode(_))));
    }

    #[test]
    fn test_with_duration() {
        let buffer = AudioBuffer::with_duration(48000, 1200.0);
        assert_eq!(buffer.duration_ms, 1200.0);
        assert!(buffer.samples.is_empty());
    }
}
