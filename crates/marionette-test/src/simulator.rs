//! Engine simulator with a manual wall clock

use tracing::debug;

use marionette_core::AnimResult;
use marionette_runtime::{AnimationEngine, EngineConfig};
use marionette_speech::{AudioDecoder, PcmDecoder, SimpleLipsync};

use crate::audio::FakeAudio;
use crate::avatar::{RecordingRenderer, SimulatedAvatar};

/// Drives one engine frame by frame.
///
/// The avatar is bound and a first tick is issued at wall time 0, so the
/// engine's logical clock starts at 0 as well.
pub struct Simulator {
    engine: AnimationEngine,
    audio: FakeAudio,
    renderer: RecordingRenderer,
    wall_ms: f64,
    frame_ms: f64,
}

impl Simulator {
    /// 60 fps render callbacks
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Seeded engine, reference humanoid, silent recording audio
    pub fn new() -> AnimResult<Self> {
        Self::with_config(EngineConfig::debug())
    }

    pub fn with_config(config: EngineConfig) -> AnimResult<Self> {
        Self::build(
            config,
            &SimulatedAvatar::humanoid(),
            FakeAudio::new(),
            Box::new(PcmDecoder::default()),
        )
    }

    pub fn build(
        config: EngineConfig,
        avatar: &SimulatedAvatar,
        audio: FakeAudio,
        decoder: Box<dyn AudioDecoder>,
    ) -> AnimResult<Self> {
        let mut engine = AnimationEngine::with_audio(config, decoder, Box::new(audio.clone()), Box::new(SimpleLipsync))?;
        let renderer = RecordingRenderer::new();
        engine.set_renderer(Box::new(renderer.clone()));
        engine.bind(avatar)?;
        engine.tick(0.0);
        Ok(Self {
            engine,
            audio,
            renderer,
            wall_ms: 0.0,
            frame_ms: Self::FRAME_MS,
        })
    }

    /// Change the render callback interval
    pub fn with_frame_ms(mut self, frame_ms: f64) -> Self {
        self.frame_ms = frame_ms.max(1.0);
        self
    }

    pub fn engine(&self) -> &AnimationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AnimationEngine {
        &mut self.engine
    }

    pub fn audio(&self) -> &FakeAudio {
        &self.audio
    }

    pub fn renderer(&self) -> &RecordingRenderer {
        &self.renderer
    }

    pub fn wall_ms(&self) -> f64 {
        self.wall_ms
    }

    /// Engine logical time
    pub fn now(&self) -> f64 {
        self.engine.now()
    }

    /// One render callback; returns whether the engine processed it
    pub fn step(&mut self) -> bool {
        self.wall_ms += self.frame_ms;
        self.engine.tick(self.wall_ms).is_some()
    }

    /// Render callbacks covering `ms` of wall time; returns frames processed
    pub fn run_for(&mut self, ms: f64) -> usize {
        let end = self.wall_ms + ms;
        let mut processed = 0;
        while self.wall_ms + self.frame_ms <= end + 1e-9 {
            if self.step() {
                processed += 1;
            }
        }
        debug!(wall_ms = self.wall_ms, processed, "simulated");
        processed
    }

    /// Step until `done` holds, for at most `max_ms` of wall time.
    ///
    /// Returns the engine time at which it first held.
    pub fn run_until(&mut self, max_ms: f64, mut done: impl FnMut(&AnimationEngine) -> bool) -> Option<f64> {
        let end = self.wall_ms + max_ms;
        while self.wall_ms < end {
            self.step();
            if done(&self.engine) {
                return Some(self.engine.now());
            }
        }
        None
    }

    /// Host reports the end of the playing buffer
    pub fn finish_audio(&mut self) {
        self.engine.audio_ended();
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("wall_ms", &self.wall_ms)
            .field("frame_ms", &self.frame_ms)
            .field("frames", &self.renderer.len())
            .field("engine", &self.engine)
            .finish()
    }
}
