//! Engine configuration

use serde::{Deserialize, Serialize};

use marionette_anim::{BodyForm, DampingConfig, SchedulerConfig, View};
use marionette_core::{AnimError, AnimResult};
use marionette_speech::SpeechConfig;
use marionette_time::ClockConfig;

/// Engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame-rate cap (None = every render callback is processed)
    pub max_fps: Option<f32>,
    /// Slowdown rate (1.0 = real time, 2.0 = half speed)
    pub slowdown_rate: f64,
    /// Largest wall-clock step accepted in one tick
    pub max_step_ms: f64,
    /// Fixed latency added when rebasing speech timelines
    pub audio_latency_ms: f64,
    pub audio_resume_timeout_ms: f64,
    pub pose_transition_ms: f64,
    /// Leg through the intermediate pose between standing and grounded stances
    pub intermediate_pose_ms: f64,
    pub baseline_approach_ms: f64,
    pub gesture_transition_ms: f64,
    pub ik_iterations: u32,
    pub initial_mood: String,
    pub initial_pose: String,
    pub view: View,
    pub body: BodyForm,
    pub lipsync_lang: String,
    /// Deterministic randomness when set
    pub rng_seed: Option<u64>,
    /// Speaking damping rules
    pub damping: DampingConfig,
    /// Share of a gaze shift the head takes; eyes cover the rest
    pub head_gaze_share: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_fps: None,
            slowdown_rate: 1.0,
            max_step_ms: 1000.0,
            audio_latency_ms: 0.0,
            audio_resume_timeout_ms: 1000.0,
            pose_transition_ms: 2000.0,
            intermediate_pose_ms: 1000.0,
            baseline_approach_ms: 1000.0,
            gesture_transition_ms: 1000.0,
            ik_iterations: 20,
            initial_mood: "neutral".into(),
            initial_pose: "straight".into(),
            view: View::Full,
            body: BodyForm::M,
            lipsync_lang: "en".into(),
            rng_seed: None,
            damping: DampingConfig::default(),
            head_gaze_share: 0.7,
        }
    }
}

impl EngineConfig {
    /// Capped frame rate and cheaper IK for battery-powered hosts
    pub fn low_power() -> Self {
        EngineConfig {
            max_fps: Some(30.0),
            ik_iterations: 10,
            ..Default::default()
        }
    }

    /// Seeded and uncapped, for reproducible runs
    pub fn debug() -> Self {
        EngineConfig {
            rng_seed: Some(0),
            max_step_ms: 100.0,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json_str(json: &str) -> AnimResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| AnimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnimResult<()> {
        let invalid = |msg: String| Err(AnimError::InvalidConfig(msg));
        if !self.slowdown_rate.is_finite() || self.slowdown_rate < 0.1 {
            return invalid(format!("slowdown_rate must be >= 0.1, got {}", self.slowdown_rate));
        }
        if let Some(fps) = self.max_fps {
            if !fps.is_finite() || fps <= 0.0 {
                return invalid(format!("max_fps must be positive, got {fps}"));
            }
        }
        if self.ik_iterations == 0 {
            return invalid("ik_iterations must be at least 1".into());
        }
        let durations = [
            ("max_step_ms", self.max_step_ms),
            ("audio_latency_ms", self.audio_latency_ms),
            ("audio_resume_timeout_ms", self.audio_resume_timeout_ms),
            ("pose_transition_ms", self.pose_transition_ms),
            ("intermediate_pose_ms", self.intermediate_pose_ms),
            ("baseline_approach_ms", self.baseline_approach_ms),
            ("gesture_transition_ms", self.gesture_transition_ms),
        ];
        for (name, ms) in durations {
            if !ms.is_finite() || ms < 0.0 {
                return invalid(format!("{name} must be a non-negative duration, got {ms}"));
            }
        }
        if !(0.0..=1.0).contains(&self.head_gaze_share) {
            return invalid(format!("head_gaze_share must be in [0, 1], got {}", self.head_gaze_share));
        }
        if let Some(rule) = self.damping.rules.iter().find(|r| !r.factor.is_finite() || r.factor < 0.0) {
            return invalid(format!("damping factor for '{}' must be non-negative", rule.prefix));
        }
        Ok(())
    }

    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            max_fps: self.max_fps,
            slowdown_rate: self.slowdown_rate,
            max_step_ms: self.max_step_ms,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            baseline_approach_ms: self.baseline_approach_ms,
            damping: self.damping.clone(),
            view: self.view,
            body: self.body,
        }
    }

    pub fn speech_config(&self) -> SpeechConfig {
        SpeechConfig {
            audio_latency_ms: self.audio_latency_ms,
            audio_resume_timeout_ms: self.audio_resume_timeout_ms,
            lipsync_lang: self.lipsync_lang.clone(),
            slowdown_rate: self.slowdown_rate,
            ..Default::default()
        }
    }
}
