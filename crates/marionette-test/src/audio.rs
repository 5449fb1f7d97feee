//! Scripted audio collaborators

use std::sync::Arc;

use parking_lot::Mutex;

use marionette_core::{AnimError, AnimResult};
use marionette_speech::{AudioBuffer, AudioDecoder, AudioOutput};

/// One `play` call
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub duration_ms: f64,
    pub rate: f64,
}

#[derive(Debug, Default)]
struct AudioState {
    played: Vec<PlayRecord>,
    stops: usize,
    resume_requests: usize,
    suspended: bool,
    fail_next: bool,
}

/// Audio output that records calls instead of making sound.
///
/// Clones share state: hand one to the engine and drive the other from the
/// test (suspend it, inspect what was played).
#[derive(Debug, Clone, Default)]
pub struct FakeAudio {
    state: Arc<Mutex<AudioState>>,
    latency_ms: f64,
}

impl FakeAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output that starts suspended, like a browser context before user input
    pub fn suspended() -> Self {
        let audio = Self::new();
        audio.set_suspended(true);
        audio
    }

    pub fn with_latency(mut self, ms: f64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.state.lock().suspended = suspended;
    }

    /// Reject the next `play` call
    pub fn fail_next_play(&self) {
        self.state.lock().fail_next = true;
    }

    pub fn played(&self) -> Vec<PlayRecord> {
        self.state.lock().played.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().stops
    }

    pub fn resume_requests(&self) -> usize {
        self.state.lock().resume_requests
    }
}

impl AudioOutput for FakeAudio {
    fn play(&mut self, buffer: &AudioBuffer, rate: f64) -> AnimResult<()> {
        let mut state = self.state.lock();
        if state.suspended {
            return Err(AnimError::AudioContextSuspended);
        }
        if state.fail_next {
            state.fail_next = false;
            return Err(AnimError::AudioDecode("scripted playback failure".into()));
        }
        state.played.push(PlayRecord {
            duration_ms: buffer.duration_ms,
            rate,
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().stops += 1;
    }

    fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    fn request_resume(&mut self) {
        self.state.lock().resume_requests += 1;
    }

    fn output_latency_ms(&self) -> f64 {
        self.latency_ms
    }
}

/// Decoder that ignores the bytes and returns a buffer of fixed length.
///
/// Empty input still fails, so undecodable payloads can be scripted.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecoder {
    pub duration_ms: f64,
}

impl FixedDecoder {
    pub fn new(duration_ms: f64) -> Self {
        Self { duration_ms }
    }
}

impl AudioDecoder for FixedDecoder {
    fn decode(&self, bytes: &[u8]) -> AnimResult<AudioBuffer> {
        if bytes.is_empty() {
            return Err(AnimError::AudioDecode("empty audio".into()));
        }
        Ok(AudioBuffer::with_duration(22050, self.duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let audio = FakeAudio::new();
        let mut engine_side = audio.clone();
        engine_side.play(&AudioBuffer::with_duration(22050, 800.0), 1.0).unwrap();
        engine_side.stop();
        assert_eq!(
            audio.played(),
            vec![PlayRecord {
                duration_ms: 800.0,
                rate: 1.0
            }]
        );
        assert_eq!(audio.stops(), 1);
    }

    #[test]
    fn test_suspended_output_rejects_play() {
        let audio = FakeAudio::suspended();
        let mut engine_side = audio.clone();
        assert!(engine_side.is_suspended());
        assert!(matches!(
            engine_side.play(&AudioBuffer::with_duration(22050, 100.0), 1.0),
            Err(AnimError::AudioContextSuspended)
        ));
        engine_side.request_resume();
        audio.set_suspended(false);
        assert!(!engine_side.is_suspended());
        assert_eq!(audio.resume_requests(), 1);
    }

    #[test]
    fn test_fixed_decoder() {
        let decoder = FixedDecoder::new(1200.0);
        assert_eq!(decoder.decode(&[1, 2, 3]).unwrap().duration_ms, 1200.0);
        assert!(decoder.decode(&[]).is_err());
    }
}
